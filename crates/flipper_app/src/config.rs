//! Console configuration, read from a RON file.
//!
//! ```ron
//! (
//!     base_url: "http://transcoder.local:9000/api/",
//!     page_limit: 50,
//!     job_interval_ms: 500,
//!     log: Both,
//! )
//! ```
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use flipper_engine::{ClientSettings, PagingSettings, PollSettings};
use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "flipper.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub page_limit: usize,
    pub pace_ms: u64,
    pub job_interval_ms: u64,
    pub counters_interval_ms: u64,
    pub queue_stats_interval_ms: u64,
    pub job_summary_interval_ms: u64,
    pub log: LogDestination,
    /// File the values were read from; `None` for built-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        let paging = PagingSettings::default();
        let poll = PollSettings::default();
        Self {
            base_url: client.base_url,
            connect_timeout_ms: millis(client.connect_timeout),
            request_timeout_ms: millis(client.request_timeout),
            page_limit: paging.page_limit,
            pace_ms: millis(paging.pace),
            job_interval_ms: millis(poll.job_interval),
            counters_interval_ms: millis(poll.counters_interval),
            queue_stats_interval_ms: millis(poll.queue_stats_interval),
            job_summary_interval_ms: millis(poll.job_summary_interval),
            log: LogDestination::Terminal,
            source: None,
        }
    }
}

impl ConsoleConfig {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn paging_settings(&self) -> PagingSettings {
        PagingSettings {
            page_limit: self.page_limit.max(1),
            pace: Duration::from_millis(self.pace_ms),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            job_interval: Duration::from_millis(self.job_interval_ms.max(1)),
            counters_interval: Duration::from_millis(self.counters_interval_ms.max(1)),
            queue_stats_interval: Duration::from_millis(self.queue_stats_interval_ms.max(1)),
            job_summary_interval: Duration::from_millis(self.job_summary_interval_ms.max(1)),
        }
    }
}

/// Loads `path`, or `flipper.ron` in the working directory when no path is given.
///
/// Only the implicit default file may be absent.
pub fn load(path: Option<&Path>) -> anyhow::Result<ConsoleConfig> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ConsoleConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading config {}", path.display()));
        }
    };
    let mut config =
        parse(&content).with_context(|| format!("parsing config {}", path.display()))?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}

pub fn parse(content: &str) -> anyhow::Result<ConsoleConfig> {
    Ok(ron::from_str(content)?)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_yields_engine_defaults() {
        let config = parse("()").unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.paging_settings(), PagingSettings::default());
        assert_eq!(config.poll_settings(), PollSettings::default());
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config = parse(r#"(base_url: "http://media.test/api/", page_limit: 5, log: Both)"#)
            .unwrap();
        assert_eq!(config.base_url, "http://media.test/api/");
        assert_eq!(config.paging_settings().page_limit, 5);
        assert_eq!(config.log, LogDestination::Both);
        assert_eq!(config.job_interval_ms, 1000);
    }

    #[test]
    fn zero_limits_are_raised_to_usable_values() {
        let config = parse("(page_limit: 0, job_interval_ms: 0)").unwrap();
        assert_eq!(config.paging_settings().page_limit, 1);
        assert_eq!(config.poll_settings().job_interval, Duration::from_millis(1));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse("(page_limit: \"many\")").is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(counters_interval_ms: 750)").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.source.as_deref(), Some(file.path()));
        assert_eq!(
            config.poll_settings().counters_interval,
            Duration::from_millis(750)
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.ron");
        assert!(load(Some(&missing)).is_err());
    }
}
