use std::path::PathBuf;
use std::time::Duration;

pub const LOG_EXPIRY_VAR: &str = "ACTORSTORE_LOG_EXPIRY";
pub const SNAPSHOT_PATH_VAR: &str = "ACTORSTORE_SNAPSHOT_PATH";

/// Store configuration
///
/// Read once by the process entry point and handed to
/// [`ActorPlatform::open`](crate::facade::ActorPlatform::open).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Time to live for execution logs; `None` keeps them forever
    pub log_expiry: Option<Duration>,

    /// Snapshot file restored on open and written by checkpoints
    pub snapshot_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log expiry. A zero duration means no expiry.
    pub fn log_expiry(mut self, expiry: Duration) -> Self {
        self.log_expiry = Some(expiry).filter(|ttl| !ttl.is_zero());
        self
    }

    /// Set the log expiry from a number of seconds, as the `log_ex` setting
    /// is usually written. Non-positive values mean no expiry.
    pub fn log_expiry_seconds(mut self, seconds: i64) -> Self {
        self.log_expiry = u64::try_from(seconds)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Build from `(name, value)` pairs; unknown names are ignored and an
    /// unparsable expiry is treated as no expiry.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::new();
        for (name, value) in vars {
            let value = value.as_ref().trim();
            match name.as_ref() {
                LOG_EXPIRY_VAR => {
                    config = match value.parse::<i64>() {
                        Ok(seconds) => config.log_expiry_seconds(seconds),
                        Err(_) => {
                            log::warn!("ignoring unparsable {LOG_EXPIRY_VAR}={value:?}");
                            Self {
                                log_expiry: None,
                                ..config
                            }
                        }
                    };
                }
                SNAPSHOT_PATH_VAR if !value.is_empty() => {
                    config = config.snapshot_path(value);
                }
                _ => {}
            }
        }
        config
    }

    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StoreConfig::new()
            .log_expiry(Duration::from_secs(30))
            .snapshot_path("/tmp/actors.snap");
        assert_eq!(config.log_expiry, Some(Duration::from_secs(30)));
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/actors.snap")));

        assert_eq!(StoreConfig::new().log_expiry(Duration::ZERO).log_expiry, None);
    }

    #[test]
    fn test_from_vars() {
        let config = StoreConfig::from_vars([
            (LOG_EXPIRY_VAR, "3600"),
            (SNAPSHOT_PATH_VAR, "/var/lib/actorstore.snap"),
            ("HOME", "/root"),
        ]);
        assert_eq!(config.log_expiry, Some(Duration::from_secs(3600)));
        assert!(config.snapshot_path.is_some());
    }

    #[test]
    fn test_non_positive_or_garbage_expiry_means_none() {
        for raw in ["0", "-5", "soon", ""] {
            let config = StoreConfig::from_vars([(LOG_EXPIRY_VAR, raw)]);
            assert_eq!(config.log_expiry, None, "{raw}");
        }
        assert_eq!(StoreConfig::from_vars([(SNAPSHOT_PATH_VAR, "  ")]).snapshot_path, None);
    }
}
