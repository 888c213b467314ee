use axum::response::Html;

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Tracker Switch</title>
<style>
  body { font-family: sans-serif; max-width: 760px; margin: 2em auto; color: #222; }
  textarea { width: 100%; height: 10em; font-family: monospace; }
  .on { color: #1a7f37; } .off { color: #b42318; }
  #message { margin-top: 1em; }
</style>
</head>
<body>
<h1>Tracker Switch</h1>
<p>Service: <strong id="status">loading</strong></p>
<button id="toggle">Toggle</button>
<h2>Managed tracker prefixes</h2>
<p>One prefix per line. Matching trackers are disabled while a torrent downloads and re-enabled at 100%.</p>
<textarea id="trackers"></textarea>
<br><button id="save">Save trackers</button>
<div id="message"></div>
<script>
let policy = { enabled: false, trackers: [] };
const $ = (id) => document.getElementById(id);

function render() {
  $("status").textContent = policy.enabled ? "enabled" : "disabled";
  $("status").className = policy.enabled ? "on" : "off";
  $("toggle").textContent = policy.enabled
    ? "Disable service and re-enable all trackers"
    : "Enable service";
  $("trackers").value = policy.trackers.join("\n");
}

async function send(path, body) {
  const init = { method: "POST", headers: { "Content-Type": "application/json" } };
  if (body !== undefined) init.body = JSON.stringify(body);
  const response = await fetch(path, init);
  const json = await response.json();
  if (!response.ok) throw new Error(json.error || response.statusText);
  return json;
}

$("toggle").onclick = async () => {
  try {
    const result = policy.enabled
      ? await send("/api/disable_and_reenable")
      : await send("/api/config/enabled", { enabled: true });
    policy = { enabled: result.enabled, trackers: result.trackers };
    $("message").textContent = "Saved.";
  } catch (e) {
    $("message").textContent = "Error: " + e.message;
  }
  render();
};

$("save").onclick = async () => {
  try {
    policy = await send("/api/config/trackers", { trackers: $("trackers").value });
    $("message").textContent = "Tracker list saved.";
  } catch (e) {
    $("message").textContent = "Error: " + e.message;
  }
  render();
};

fetch("/api/config").then((r) => r.json()).then((p) => { policy = p; render(); });
</script>
</body>
</html>
"#;

/// GET /
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
