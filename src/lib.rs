pub mod core {
    pub mod config;
    pub mod error;
    pub mod routes;
    pub mod startup;
    pub mod state;
    pub mod tracing_init;
}

pub mod api {
    pub mod gateway;
    pub mod transmission;

    #[cfg(test)]
    pub mod fake;
}

pub mod models {
    pub mod control;
    pub mod policy;
    pub mod torrent;
}

pub mod stores {
    pub mod policy_store;
}

pub mod reconcile {
    pub mod cycle;
    pub mod matcher;
    pub mod plan;
    pub mod reenable;
}

pub mod handlers {
    pub mod config;
    pub mod fallback;
    pub mod health;
    pub mod index;
    pub mod metrics;
}

pub mod metrics {
    pub mod collector;
}

pub mod utils {
    pub mod time;
}
