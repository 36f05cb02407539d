use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Prefix every endpoint path is resolved against.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to every request except record feeds and uploads.
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingSettings {
    /// Records pulled before the read loop stops and waits for `load_more`.
    pub page_limit: usize,
    /// Pause between two pulls so the view can re-render.
    pub pace: Duration,
}

impl Default for PagingSettings {
    fn default() -> Self {
        Self {
            page_limit: 30,
            pace: Duration::from_millis(25),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub job_interval: Duration,
    pub counters_interval: Duration,
    pub queue_stats_interval: Duration,
    pub job_summary_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            job_interval: Duration::from_secs(1),
            counters_interval: Duration::from_secs(3),
            queue_stats_interval: Duration::from_secs(3),
            job_summary_interval: Duration::from_secs(1),
        }
    }
}
