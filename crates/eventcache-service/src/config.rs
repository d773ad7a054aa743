use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, de};
use tracing::level_filters::LevelFilter;

/// Controls the log format
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect (pretty for tty, simplified for other)
    Auto,
    /// With colors
    Pretty,
    /// Simplified log output
    Simplified,
    /// Dump out JSON lines
    Json,
}

/// Controls the logging system.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// The log level for the service.
    #[serde(deserialize_with = "deserialize_level_filter")]
    pub level: LevelFilter,
    /// Controls the log format.
    pub format: LogFormat,
    /// When set to true, backtraces are forced on.
    pub enable_backtraces: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
            enable_backtraces: true,
        }
    }
}

/// Control the metrics.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct Metrics {
    /// host/port of statsd instance
    pub statsd: Option<String>,
    /// The prefix that should be added to all metrics.
    pub prefix: String,
    /// A map containing custom tags and their values.
    ///
    /// These tags will be appended to every metric.
    pub custom_tags: BTreeMap<String, String>,
}

/// The cache backend to construct at startup.
///
/// This is the only place where the two backends are told apart; everything
/// else goes through the [`CacheProvider`](crate::caching::CacheProvider)
/// contract.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// The process-local in-memory store.
    #[default]
    InMemory,
    /// A remote store shared between instances.
    Remote,
}

/// Settings for the cache provider.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Which backend to construct.
    pub backend: CacheBackend,

    /// Credential for the remote backend, passed through unexamined.
    pub remote_credential: Option<String>,

    /// Bypass the store entirely and always invoke the supplier.
    ///
    /// This is meant for development and automated-test deployments where
    /// deterministic, uncached reads matter more than latency.
    pub bypass: bool,

    /// Maximum number of entries kept in the in-memory store.
    pub capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::InMemory,
            remote_credential: None,
            bypass: false,
            capacity: 100_000,
        }
    }
}

/// Intervals for the standard periodic jobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// How often the keep-warm sweep over registered cache entries runs.
    #[serde(with = "humantime_serde")]
    pub refresh_caches_interval: Duration,

    /// How often the leaderboard aggregate is recomputed.
    #[serde(with = "humantime_serde")]
    pub leaderboard_interval: Duration,

    /// The trailing activity window the leaderboard is computed over.
    #[serde(with = "humantime_serde")]
    pub leaderboard_window: Duration,

    /// How often the cleanup sweep over archived records runs.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            refresh_caches_interval: Duration::from_secs(5 * 60),
            leaderboard_interval: Duration::from_secs(24 * 3600),
            leaderboard_window: Duration::from_secs(365 * 24 * 3600),
            cleanup_interval: Duration::from_secs(24 * 3600),
        }
    }
}

/// The top-level service configuration, read from a YAML file.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Configuration for internal logging.
    pub logging: Logging,

    /// Configuration for reporting metrics to a statsd instance.
    pub metrics: Metrics,

    /// Cache provider settings.
    pub cache: CacheSettings,

    /// Periodic job settings.
    pub jobs: JobSettings,
}

impl Config {
    pub fn get(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_reader(
                fs::File::open(path).context("failed to open configuration file")?,
            ),
            None => Ok(Config::default()),
        }
    }

    fn from_reader(mut reader: impl std::io::Read) -> Result<Self> {
        let mut config = String::new();
        reader
            .read_to_string(&mut config)
            .context("failed reading config file")?;
        if config.trim().is_empty() {
            anyhow::bail!("config file empty");
        }
        // check for empty files explicitly
        serde_yaml::from_str(&config).context("failed to parse config YAML")
    }
}

#[derive(Debug)]
struct LevelFilterVisitor;

impl<'de> de::Visitor<'de> for LevelFilterVisitor {
    type Value = LevelFilter;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            r#"one of the strings "off", "error", "warn", "info", "debug", or "trace""#
        )
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match v {
            "off" => Ok(LevelFilter::OFF),
            "error" => Ok(LevelFilter::ERROR),
            "warn" => Ok(LevelFilter::WARN),
            "info" => Ok(LevelFilter::INFO),
            "debug" => Ok(LevelFilter::DEBUG),
            "trace" => Ok(LevelFilter::TRACE),
            _ => Err(de::Error::unknown_variant(
                v,
                &["off", "error", "warn", "info", "debug", "trace"],
            )),
        }
    }
}

fn deserialize_level_filter<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<LevelFilter, D::Error> {
    deserializer.deserialize_str(LevelFilterVisitor)
}
