// Runtime configuration shared by the API and the CLI.
// Values come from the environment; binaries may override them with flags.

use std::time::Duration;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Base URL of the execution service; requests go to `{service_url}/execute`.
    pub service_url: String,
    /// Transport timeout for a single execution call. `None` keeps the HTTP
    /// client's default, which never times out.
    pub request_timeout: Option<Duration>,
    pub bind_addr: String,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl ArenaConfig {
    /// Read `ARENA_SERVICE_URL`, `ARENA_HTTP_TIMEOUT_SECS` and `ARENA_BIND_ADDR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let service_url = lookup("ARENA_SERVICE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.service_url);

        // An unparseable timeout is ignored rather than fatal
        let request_timeout = lookup("ARENA_HTTP_TIMEOUT_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let bind_addr = lookup("ARENA_BIND_ADDR")
            .filter(|addr| !addr.trim().is_empty())
            .unwrap_or(defaults.bind_addr);

        Self {
            service_url,
            request_timeout,
            bind_addr,
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL of the execute endpoint.
    pub fn execute_url(&self) -> String {
        format!("{}/execute", self.service_url.trim_end_matches('/'))
    }
}
