//! Configuration module for the StudySpot Live service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;

/// Which document store backs the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Document store backend (sqlite or memory)
    pub store: StoreKind,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Collection holding the spot documents
    pub collection: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Upper bound on every remote store call
    pub remote_timeout: Duration,
    /// Spot written when the first server read finds the collection empty
    pub seed_spot_name: Option<String>,
    /// Fallbacks taken while loading, logged once the subscriber is installed
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreKind::Sqlite,
            db_path: PathBuf::from("./data/studyspots.sqlite"),
            collection: "study_spots".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_json: false,
            remote_timeout: Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS),
            seed_spot_name: None,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Invalid values fall back to their defaults and leave a note in `warnings`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let mut warnings = Vec::new();

        let store = match env::var("STUDYSPOT_STORE").ok().as_deref() {
            None | Some("sqlite") => StoreKind::Sqlite,
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                warnings.push(format!("Unknown STUDYSPOT_STORE {:?}, using sqlite", other));
                StoreKind::Sqlite
            }
        };

        let db_path = env::var("STUDYSPOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let collection = env::var("STUDYSPOT_COLLECTION")
            .ok()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(defaults.collection);

        let bind_addr = match env::var("STUDYSPOT_BIND_ADDR") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warnings.push(format!(
                    "Invalid STUDYSPOT_BIND_ADDR {:?}, using {}",
                    raw, DEFAULT_BIND_ADDR
                ));
                defaults.bind_addr
            }),
            Err(_) => defaults.bind_addr,
        };

        let log_level = env::var("STUDYSPOT_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_json = env::var("STUDYSPOT_LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let remote_timeout = match env::var("STUDYSPOT_REMOTE_TIMEOUT_MS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warnings.push(format!(
                        "Invalid STUDYSPOT_REMOTE_TIMEOUT_MS {:?}, using {}",
                        raw, DEFAULT_REMOTE_TIMEOUT_MS
                    ));
                    defaults.remote_timeout
                }
            },
            Err(_) => defaults.remote_timeout,
        };

        let seed_spot_name = env::var("STUDYSPOT_SEED_SPOT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            store,
            db_path,
            collection,
            bind_addr,
            log_level,
            log_json,
            remote_timeout,
            seed_spot_name,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 8] = [
        "STUDYSPOT_STORE",
        "STUDYSPOT_DB_PATH",
        "STUDYSPOT_COLLECTION",
        "STUDYSPOT_BIND_ADDR",
        "STUDYSPOT_LOG_LEVEL",
        "STUDYSPOT_LOG_JSON",
        "STUDYSPOT_REMOTE_TIMEOUT_MS",
        "STUDYSPOT_SEED_SPOT",
    ];

    // Both cases share process-wide environment, so they run in one test.
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("./data/studyspots.sqlite"));
        assert_eq!(config.collection, "study_spots");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
        assert!(config.seed_spot_name.is_none());
        assert!(config.warnings.is_empty());

        env::set_var("STUDYSPOT_STORE", "memory");
        env::set_var("STUDYSPOT_BIND_ADDR", "not-an-address");
        env::set_var("STUDYSPOT_REMOTE_TIMEOUT_MS", "250");
        env::set_var("STUDYSPOT_SEED_SPOT", "  Library ");
        env::set_var("STUDYSPOT_LOG_JSON", "TRUE");

        let config = Config::from_env();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.remote_timeout, Duration::from_millis(250));
        assert_eq!(config.seed_spot_name.as_deref(), Some("Library"));
        assert!(config.log_json);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("STUDYSPOT_BIND_ADDR"));

        env::set_var("STUDYSPOT_STORE", "cloud");
        env::set_var("STUDYSPOT_REMOTE_TIMEOUT_MS", "abc");

        let config = Config::from_env();
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
        assert_eq!(config.warnings.len(), 3);
        assert!(config.warnings[0].contains("STUDYSPOT_STORE"));
        assert!(config.warnings[2].contains("STUDYSPOT_REMOTE_TIMEOUT_MS"));

        for var in VARS {
            env::remove_var(var);
        }
    }
}
