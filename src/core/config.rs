use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub transmission: TransmissionConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control surface listener
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransmissionConfig {
    #[serde(default = "default_transmission_host")]
    pub host: String,
    #[serde(default = "default_transmission_port")]
    pub port: u16,
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,
    #[serde(default)]
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound for a single RPC request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_disabled_marker")]
    pub disabled_marker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_policy_path")]
    pub policy_path: PathBuf,
    /// Prefixes written into the policy file when it is first created
    #[serde(default)]
    pub initial_trackers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_transmission_host() -> String {
    "localhost".to_string()
}

fn default_transmission_port() -> u16 {
    9091
}

fn default_rpc_path() -> String {
    "/transmission/rpc".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    60
}

fn default_disabled_marker() -> String {
    crate::reconcile::matcher::DEFAULT_MARKER.to_string()
}

fn default_policy_path() -> PathBuf {
    PathBuf::from("/data/config.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_server_port(),
            num_threads: default_num_threads(),
        }
    }
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            host: default_transmission_host(),
            port: default_transmission_port(),
            rpc_path: default_rpc_path(),
            use_tls: false,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            disabled_marker: default_disabled_marker(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            policy_path: default_policy_path(),
            initial_trackers: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

impl TransmissionConfig {
    pub fn endpoint(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.rpc_path)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// File (or defaults when no path is given), then environment overrides,
    /// then validation. Read once at startup.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment-style overrides. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = get("TR_HOST").or_else(|| get("TR_IP")) {
            self.transmission.host = host;
        }
        if let Some(port) = get("TR_PORT") {
            self.transmission.port = port
                .parse()
                .context(format!("TR_PORT is not a valid port: {}", port))?;
        }
        if let Some(username) = get("TR_USERNAME") {
            self.transmission.username = Some(username);
        }
        if let Some(password) = get("TR_PASSWORD") {
            self.transmission.password = Some(password);
        }
        if let Some(interval) = get("CHECK_INTERVAL") {
            self.reconcile.interval_secs = interval
                .parse()
                .context(format!("CHECK_INTERVAL is not a number of seconds: {}", interval))?;
        }
        if let Some(marker) = get("DISABLED_MARKER") {
            self.reconcile.disabled_marker = marker;
        }
        if let Some(trackers) = get("TARGET_TRACKERS") {
            self.storage.initial_trackers =
                crate::models::policy::normalize_prefixes(trackers.split(','));
        }
        if let Some(path) = get("POLICY_PATH") {
            self.storage.policy_path = PathBuf::from(path);
        }
        if let Some(port) = get("WEB_PORT") {
            self.server.port = port
                .parse()
                .context(format!("WEB_PORT is not a valid port: {}", port))?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if get("DEBUG_MODE").is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "t")) {
            self.logging.level = "debug".to_string();
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Server port must be greater than 0");
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.transmission.host.is_empty() {
            bail!("transmission host must not be empty");
        }

        if self.transmission.port == 0 {
            bail!("transmission port must be greater than 0");
        }

        if !self.transmission.rpc_path.starts_with('/') {
            bail!(
                "rpc_path must start with '/', got '{}'",
                self.transmission.rpc_path
            );
        }

        if self.transmission.timeout_secs == 0 {
            bail!("timeout_secs must be greater than 0");
        }

        if self.reconcile.interval_secs == 0 {
            bail!("interval_secs must be greater than 0");
        }

        let marker = &self.reconcile.disabled_marker;
        if marker.is_empty() {
            bail!("disabled_marker must not be empty");
        }
        if marker.chars().any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | ':' | '@')) {
            bail!(
                "disabled_marker '{}' must be usable inside a host name",
                marker
            );
        }

        if self.storage.policy_path.as_os_str().is_empty() {
            bail!("policy_path must not be empty");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
