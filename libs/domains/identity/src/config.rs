//! Runtime knobs for the identity domain, read from the environment.

use core_config::{ConfigError, FromEnv, env_parse_or};
use std::time::Duration;

/// Async lookup and directory seeding configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    /// Deadline applied by `BoundedWait` (`LOOKUP_TIMEOUT_SECS`)
    pub timeout: Duration,
    /// Lookups allowed to execute at once (`LOOKUP_MAX_IN_FLIGHT`)
    pub max_in_flight: usize,
    /// Seed the directory with `admin` and `guest` (`SEED_DEMO_USERS`)
    pub seed_demo_users: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_in_flight: 64,
            seed_demo_users: true,
        }
    }
}

impl FromEnv for LookupConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_secs = env_parse_or("LOOKUP_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        let max_in_flight = env_parse_or("LOOKUP_MAX_IN_FLIGHT", defaults.max_in_flight)?;
        let seed_demo_users = env_parse_or("SEED_DEMO_USERS", defaults.seed_demo_users)?;

        if max_in_flight == 0 {
            return Err(ConfigError::ParseError {
                key: "LOOKUP_MAX_IN_FLIGHT".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            max_in_flight,
            seed_demo_users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 3] = [
        "LOOKUP_TIMEOUT_SECS",
        "LOOKUP_MAX_IN_FLIGHT",
        "SEED_DEMO_USERS",
    ];

    #[test]
    fn test_defaults_when_unset() {
        temp_env::with_vars_unset(KEYS, || {
            let config = LookupConfig::from_env().unwrap();
            assert_eq!(config, LookupConfig::default());
            assert_eq!(config.timeout, Duration::from_secs(10));
        });
    }

    #[test]
    fn test_reads_overrides() {
        temp_env::with_vars(
            [
                ("LOOKUP_TIMEOUT_SECS", Some("2")),
                ("LOOKUP_MAX_IN_FLIGHT", Some("8")),
                ("SEED_DEMO_USERS", Some("false")),
            ],
            || {
                let config = LookupConfig::from_env().unwrap();
                assert_eq!(config.timeout, Duration::from_secs(2));
                assert_eq!(config.max_in_flight, 8);
                assert!(!config.seed_demo_users);
            },
        );
    }

    #[test]
    fn test_invalid_timeout_is_error() {
        temp_env::with_var("LOOKUP_TIMEOUT_SECS", Some("soon"), || {
            let err = LookupConfig::from_env().unwrap_err();
            assert!(
                matches!(err, ConfigError::ParseError { ref key, .. } if key == "LOOKUP_TIMEOUT_SECS")
            );
        });
    }

    #[test]
    fn test_zero_in_flight_is_error() {
        temp_env::with_var("LOOKUP_MAX_IN_FLIGHT", Some("0"), || {
            assert!(LookupConfig::from_env().is_err());
        });
    }
}
