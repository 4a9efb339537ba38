use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Root directory for the local storage provider.
    pub storage_root: String,
    /// Which storage provider to construct at startup: "local" or "memory".
    pub storage_kind: String,
    pub max_file_size_bytes: u64,
    pub temp_file_ttl_minutes: i64,
    pub cleanup_interval_minutes: u64,
    pub token_ttl_hours: i64,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "helpdesk-api".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/helpdesk.log".into());
            let database_url =
                env::var("DATABASE_URL").unwrap_or_else(|_| "data/helpdesk.db".into());
            let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
            let port = env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000);

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                fs::create_dir_all(parent).expect("Failed to create log directory");
            }

            let storage_root =
                env::var("STORAGE_ROOT").unwrap_or_else(|_| "data/file_storage".into());
            let storage_kind = env::var("STORAGE_KIND").unwrap_or_else(|_| "local".into());
            let max_file_size_bytes = env::var("MAX_FILE_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5 * 1024 * 1024);
            let temp_file_ttl_minutes = env::var("TEMP_FILE_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(40);
            let cleanup_interval_minutes = env::var("CLEANUP_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24);

            Config {
                project_name,
                log_level,
                log_file,
                database_url,
                host,
                port,
                storage_root,
                storage_kind,
                max_file_size_bytes,
                temp_file_ttl_minutes,
                cleanup_interval_minutes,
                token_ttl_hours,
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }
}
