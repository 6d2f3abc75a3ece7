//! Configuration management for the Filechest server

use std::env;
use std::path::PathBuf;

/// Fixed upload ceiling: 5 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub banlist_path: PathBuf,
    pub audit_log_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Flat directory all blobs live in. Created lazily on first write.
    pub root: PathBuf,
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                root: PathBuf::from("./uploads"),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            database: DatabaseConfig {
                url: "sqlite:./filechest.db".to_string(),
            },
            banlist_path: PathBuf::from("./banlist.json"),
            audit_log_path: PathBuf::from("./upload-audit.log"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            storage: StorageConfig {
                root: env::var("STORAGE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.root),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.storage.max_upload_bytes),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            banlist_path: env::var("BANLIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.banlist_path),
            audit_log_path: env::var("AUDIT_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_log_path),
        }
    }
}
