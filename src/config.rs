use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "appointdesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of appointments shown on the doctor dashboard
pub const LATEST_APPOINTMENTS: usize = 5;

/// Env var overriding the snapshot file location
pub const DATA_ENV: &str = "APPOINTDESK_DATA";
/// Env var overriding the log filter (`RUST_LOG` still wins)
pub const LOG_ENV: &str = "APPOINTDESK_LOG";

const SNAPSHOT_FILE: &str = "appointdesk.json";

/// Log filter used when neither `RUST_LOG` nor `APPOINTDESK_LOG` is set
pub fn default_log_filter() -> &'static str {
    "appointdesk=info,warn"
}

/// Directory holding the snapshot: ~/.appointdesk, or the working
/// directory when no home is known.
pub fn data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".appointdesk"),
        None => PathBuf::from("."),
    }
}

/// Runtime configuration resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_file: PathBuf,
    pub log_filter: String,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_file = lookup(DATA_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join(SNAPSHOT_FILE));

        let log_filter = lookup(LOG_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default_log_filter().to_string());

        Config {
            data_file,
            log_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_env_empty() {
        let config = Config::from_lookup(|_| None);
        assert!(config.data_file.ends_with(SNAPSHOT_FILE));
        assert!(config.data_file.starts_with(data_dir()));
        assert_eq!(config.log_filter, default_log_filter());
    }

    #[test]
    fn env_overrides_are_applied() {
        let env: HashMap<&str, &str> = [
            (DATA_ENV, "/tmp/clinic.json"),
            (LOG_ENV, "appointdesk=debug"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.data_file, PathBuf::from("/tmp/clinic.json"));
        assert_eq!(config.log_filter, "appointdesk=debug");
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = Config::from_lookup(|_| Some("  ".to_string()));
        assert!(config.data_file.ends_with(SNAPSHOT_FILE));
        assert_eq!(config.log_filter, default_log_filter());
    }

    #[test]
    fn app_name_is_appointdesk() {
        assert_eq!(APP_NAME, "appointdesk");
    }
}
