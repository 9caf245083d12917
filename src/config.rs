// Runtime configuration, read from the environment (and `.env` if present)

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Insert the default test accounts on startup
    pub seed_accounts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("meter_readings.db"),
            host: "0.0.0.0".to_string(),
            port: 3000,
            seed_accounts: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a number, got {0:?}")]
    Port(String),

    #[error("SEED_ACCOUNTS must be true or false, got {0:?}")]
    SeedAccounts(String),

    #[error("Invalid listen address {0:?}")]
    Address(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::Port(port))?;
        }
        if let Some(seed) = lookup("SEED_ACCOUNTS") {
            config.seed_accounts = match seed.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(ConfigError::SeedAccounts(seed)),
            };
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Address(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listen_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_PATH", "/tmp/readings.db"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("SEED_ACCOUNTS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/readings.db"));
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert!(!config.seed_accounts);
    }

    #[test]
    fn test_bad_port() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Port(_)));
    }

    #[test]
    fn test_bad_seed_flag() {
        let err = Config::from_lookup(lookup_from(&[("SEED_ACCOUNTS", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::SeedAccounts(_)));
    }
}
