//! Configuration types.

use crate::error::ConfigError;

/// Service configuration, read from the environment with sensible defaults.
#[derive(Debug, Clone)]
pub struct OnboardConfig {
    /// Path to the libSQL database file.
    pub db_path: String,
    /// Port the REST server binds to.
    pub port: u16,
}

impl Default for OnboardConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/campus-onboard.db".to_string(),
            port: 8080,
        }
    }
}

impl OnboardConfig {
    /// Build a config from `CAMPUS_ONBOARD_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path =
            std::env::var("CAMPUS_ONBOARD_DB_PATH").unwrap_or(defaults.db_path);

        let port = match std::env::var("CAMPUS_ONBOARD_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "CAMPUS_ONBOARD_PORT".to_string(),
                message: e.to_string(),
            })?,
            Err(_) => defaults.port,
        };

        Ok(Self { db_path, port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = OnboardConfig::default();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.db_path.ends_with("campus-onboard.db"));
    }
}
