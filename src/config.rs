use std::time::Duration;

/// Fallback cache lifetime when `cacheLife` is missing or unparsable.
pub const DEFAULT_CACHE_LIFE: Duration = Duration::from_secs(60);

/// Backend options, parsed from a connection-string style DSN
/// (`url=https://...&cacheLife=1m&file=/var/lib/tokens.json`).
///
/// Unknown keys are ignored so backends can share one DSN.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub url: String,
    pub file: String,
    cache_life: Option<Duration>,
}

impl BackendConfig {
    pub fn parse(dsn: &str) -> Self {
        let mut config = BackendConfig::default();

        for (key, value) in url::form_urlencoded::parse(dsn.as_bytes()) {
            match key.as_ref() {
                "url" => config.url = value.into_owned(),
                "file" => config.file = value.into_owned(),
                "cacheLife" => {
                    // A zero lifetime is as unusable as an unparsable one.
                    config.cache_life = parse_duration(&value).filter(|d| !d.is_zero());
                    if config.cache_life.is_none() {
                        tracing::warn!(
                            value = %value,
                            "unparsable cacheLife, falling back to one minute"
                        );
                    }
                }
                _ => {}
            }
        }

        config
    }

    /// Configured cache lifetime, defaulting to one minute.
    pub fn cache_life(&self) -> Duration {
        self.cache_life.unwrap_or(DEFAULT_CACHE_LIFE)
    }
}

/// Parse durations like "500ms", "30s", "5m", "2h", "1d".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(val) = s.strip_suffix("ms") {
        val.parse().ok().map(Duration::from_millis)
    } else if let Some(val) = s.strip_suffix('s') {
        val.parse().ok().map(Duration::from_secs)
    } else if let Some(val) = s.strip_suffix('m') {
        val.parse::<u64>().ok().map(|v| Duration::from_secs(v * 60))
    } else if let Some(val) = s.strip_suffix('h') {
        val.parse::<u64>().ok().map(|v| Duration::from_secs(v * 3600))
    } else if let Some(val) = s.strip_suffix('d') {
        val.parse::<u64>().ok().map(|v| Duration::from_secs(v * 86400))
    } else {
        None
    }
}
