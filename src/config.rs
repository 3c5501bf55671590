use std::path::PathBuf;
use std::time::Duration;

use crate::model::TaskId;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";
pub const DEFAULT_RECONNECT_MS: u64 = 5_000;
pub const DEFAULT_POLL_MS: u64 = 3_000;

/// Resolved endpoints and timings for talking to the task service.
/// Pure data structure with no I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// REST base URL, without the `/api/v1` prefix
    /// Example: http://localhost:8000
    pub api_url: String,

    /// Streaming base URL
    /// Example: ws://localhost:8000
    pub ws_url: String,

    /// Fixed delay between reconnect attempts
    pub reconnect_interval: Duration,

    /// How often the viewer re-fetches the observed task
    pub poll_interval: Duration,

    /// Bearer token attached to REST calls when set
    pub api_token: Option<String>,

    /// Log file used by the full-screen viewer
    /// Example: /tmp/devbud-tui/devbud-tui.log
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve_with(|_| None)
    }
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// # Environment
    ///
    /// * `DEVBUD_API_URL` - REST base (default `http://localhost:8000`).
    /// * `DEVBUD_WS_URL` - streaming base (default `ws://localhost:8000`).
    /// * `DEVBUD_RECONNECT_MS` - reconnect delay in milliseconds (default 5000).
    /// * `DEVBUD_POLL_MS` - task poll interval in milliseconds (default 3000).
    /// * `DEVBUD_API_TOKEN` - bearer token for REST calls (default none).
    /// * `DEVBUD_LOG_FILE` - viewer log file.
    pub fn from_env() -> Self {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary lookup.
    ///
    /// Pure function apart from whatever `lookup` does. Unparseable numbers
    /// fall back to defaults; trailing slashes are stripped from URLs.
    ///
    /// # Examples
    ///
    /// ```
    /// use devbud_tui::config::Settings;
    ///
    /// let settings = Settings::resolve_with(|key| match key {
    ///     "DEVBUD_API_URL" => Some("http://tasks.internal:9000/".to_string()),
    ///     _ => None,
    /// });
    ///
    /// assert_eq!(settings.api_url, "http://tasks.internal:9000");
    /// assert_eq!(settings.ws_url, "ws://localhost:8000");
    /// ```
    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            api_url: normalize_base(lookup("DEVBUD_API_URL").as_deref().unwrap_or(DEFAULT_API_URL)),
            ws_url: normalize_base(lookup("DEVBUD_WS_URL").as_deref().unwrap_or(DEFAULT_WS_URL)),
            reconnect_interval: Duration::from_millis(millis("DEVBUD_RECONNECT_MS", DEFAULT_RECONNECT_MS)),
            poll_interval: Duration::from_millis(millis("DEVBUD_POLL_MS", DEFAULT_POLL_MS)),
            api_token: lookup("DEVBUD_API_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            log_file: lookup("DEVBUD_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp").join("devbud-tui").join("devbud-tui.log")),
        }
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = normalize_base(url);
        self
    }

    pub fn with_ws_url(mut self, url: &str) -> Self {
        self.ws_url = normalize_base(url);
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Channel carrying output for a single task.
    pub fn task_channel_url(&self, task_id: &TaskId) -> String {
        format!("{}/ws/task/{}", self.ws_url, task_id)
    }

    /// Channel carrying periodic active-task status updates.
    pub fn all_tasks_channel_url(&self) -> String {
        format!("{}/ws/tasks", self.ws_url)
    }
}

fn normalize_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
