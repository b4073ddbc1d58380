use std::path::PathBuf;
use std::time::Duration;

use shelf_core::{AppConfig, MediaCategory};

/// Settings threaded into every resolver at construction.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub user_agent: String,
    pub referer: String,
    pub search_base_url: String,
    pub search_limit: usize,
    pub cast_limit: usize,
    pub detail_timeout: Duration,
    pub cover_timeout: Duration,
    /// Detail-page host → category. First match wins.
    pub routes: Vec<(String, MediaCategory)>,
    pub covers_dir: PathBuf,
}

impl ScrapeConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let fetch = &config.fetch;
        Self {
            user_agent: fetch.user_agent.clone(),
            referer: fetch.referer.clone(),
            search_base_url: fetch.search_base_url.trim_end_matches('/').to_string(),
            search_limit: fetch.search_limit,
            cast_limit: fetch.cast_limit,
            detail_timeout: Duration::from_secs(fetch.detail_timeout_secs),
            cover_timeout: Duration::from_secs(fetch.cover_timeout_secs),
            routes: fetch.hosts.routes(),
            covers_dir: config.covers_dir(),
        }
    }

    /// Category for a detail-page host, compared case-insensitively.
    /// Routes may carry a port (`127.0.0.1:8080`) or not.
    pub fn route_host(&self, host: &str, port: Option<u16>) -> Option<MediaCategory> {
        let with_port = port.map(|p| format!("{host}:{p}"));
        self.routes.iter().find_map(|(route, category)| {
            let hit = route.eq_ignore_ascii_case(host)
                || with_port
                    .as_deref()
                    .is_some_and(|hp| route.eq_ignore_ascii_case(hp));
            hit.then_some(*category)
        })
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}
