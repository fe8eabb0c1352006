use std::env;
use std::net::SocketAddr;

use crate::totp::TotpConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Settings of the HTTP adapter, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the TOTP routes are served at all.
    pub totp_enabled: bool,
    pub database_url: String,
    pub issuer: String,
    pub jwt_secret: String,
    pub listen_addr: SocketAddr,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let totp_enabled = match get("TOTP_ENABLED") {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                key: "TOTP_ENABLED",
                value,
            })?,
        };

        let listen_addr = match get("LISTEN_ADDR") {
            None => SocketAddr::from(([127, 0, 0, 1], 8080)),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "LISTEN_ADDR",
                value,
            })?,
        };

        Ok(Self {
            totp_enabled,
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://users.db".to_string()),
            issuer: get("TOTP_ISSUER").unwrap_or_else(|| TotpConfig::default().issuer),
            jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            listen_addr,
        })
    }

    pub fn totp_config(&self) -> TotpConfig {
        TotpConfig::new(self.issuer.clone())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert!(config.totp_enabled);
        assert_eq!(config.database_url, "sqlite://users.db");
        assert_eq!(config.issuer, "ovpn-admin");
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("TOTP_ENABLED", "off"),
            ("DATABASE_URL", "sqlite:///var/lib/panel/users.db"),
            ("TOTP_ISSUER", "Corp VPN"),
            ("LISTEN_ADDR", "0.0.0.0:9000"),
        ])
        .unwrap();
        assert!(!config.totp_enabled);
        assert_eq!(config.database_url, "sqlite:///var/lib/panel/users.db");
        assert_eq!(config.totp_config().issuer, "Corp VPN");
        assert_eq!(config.listen_addr.port(), 9000);
    }

    #[test]
    fn test_missing_jwt_secret() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(matches!(
            load(&[("JWT_SECRET", "  ")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("TOTP_ENABLED", "maybe")]),
            Err(ConfigError::Invalid { key: "TOTP_ENABLED", .. })
        ));
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("LISTEN_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "LISTEN_ADDR", .. })
        ));
    }
}
