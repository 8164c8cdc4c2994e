use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub path: String,
    /// Insert the development fixtures at startup
    pub seed: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    /// Page size for posts, comments, likes, follows and groups
    pub page_size: u32,
    /// Page size for group member listings
    pub member_page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: 10,
            member_page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Session {
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub pagination: Pagination,
    pub session: Session,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // 1. Optional settings.toml
        let config_file_name = "settings.toml";

        let current_dir_path = PathBuf::from(config_file_name);
        if current_dir_path.exists() {
            builder = builder.add_source(File::from(current_dir_path).required(false));
        }

        // Check in sync-server directory (for development)
        let dev_path = PathBuf::from("sync-server").join(config_file_name);
        if dev_path.exists() {
            builder = builder.add_source(File::from(dev_path).required(false));
        }

        // 2. Defaults, then environment variables (highest priority)
        builder = builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.path", "sync.db")?
            .set_default("database.seed", false)?
            .set_default("pagination.page_size", 10)?
            .set_default("pagination.member_page_size", 20)?
            .set_default("session.ttl_days", 30)?;

        if let Ok(db_path) = std::env::var("DATABASE_PATH") {
            builder = builder.set_override("database.path", db_path)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        if let Ok(host) = std::env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }
        if let Ok(seed) = std::env::var("SEED_TEST_DATA") {
            builder = builder.set_override("database.seed", seed)?;
        }

        let s = builder.build()?;
        s.try_deserialize()
    }
}
