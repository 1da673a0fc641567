use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub host: IpAddr,
    pub port: u16,
    pub portal_base_url: String,
    pub cache_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub storage_base_url: String,
    pub payment_url: Option<String>,
    pub sync_interval: Duration,
    pub max_upload_size: usize,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let store = match env_or("SHIFTER_STORE", "postgres").as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: env_required("DATABASE_URL")?,
            },
            other => return Err(format!("Invalid SHIFTER_STORE: {other}")),
        };

        let host: IpAddr = env_or("SHIFTER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SHIFTER_HOST: {e}"))?;

        let port: u16 = env_or("SHIFTER_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SHIFTER_PORT: {e}"))?;

        let portal_base_url = env_or("SHIFTER_PORTAL_BASE_URL", "https://shifter.com/portal")
            .trim_end_matches('/')
            .to_string();

        let cache_dir = PathBuf::from(env_or("SHIFTER_CACHE_DIR", "./data/cache"));
        let storage_dir = PathBuf::from(env_or("SHIFTER_STORAGE_DIR", "./data/storage"));
        let storage_base_url = env_or(
            "SHIFTER_STORAGE_BASE_URL",
            &format!("http://{host}:{port}/storage"),
        )
        .trim_end_matches('/')
        .to_string();

        let payment_url = std::env::var("SHIFTER_PAYMENT_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim_end_matches('/').to_string());

        let sync_secs: u64 = env_or("SHIFTER_SYNC_INTERVAL_SECS", "30")
            .parse()
            .map_err(|e| format!("Invalid SHIFTER_SYNC_INTERVAL_SECS: {e}"))?;
        if sync_secs == 0 {
            return Err("SHIFTER_SYNC_INTERVAL_SECS must be at least 1".to_string());
        }

        let max_upload_size: usize = env_or("SHIFTER_MAX_UPLOAD_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid SHIFTER_MAX_UPLOAD_SIZE: {e}"))?;

        let log_level = env_or("SHIFTER_LOG_LEVEL", "info");

        Ok(Config {
            store,
            host,
            port,
            portal_base_url,
            cache_dir,
            storage_dir,
            storage_base_url,
            payment_url,
            sync_interval: Duration::from_secs(sync_secs),
            max_upload_size,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
