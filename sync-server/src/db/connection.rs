use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use super::schema::{SCHEMA, TEST_DATA};

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

/// Milliseconds a writer waits on a locked database before giving up
const BUSY_TIMEOUT_MS: u32 = 5000;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling support
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// Every SQLite in-memory connection is its own private database, so an
    /// in-memory pool is capped at a single connection.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let is_memory = Self::is_memory_path(&path);
        let manager = Self::create_connection_manager(path, is_memory);

        let mut builder = Pool::builder();
        if is_memory {
            builder = builder.max_size(1);
        }
        let pool = builder
            .build(manager)
            .context("Failed to create database connection pool")?;

        Ok(Self { pool })
    }

    fn is_memory_path<P: AsRef<Path>>(path: &P) -> bool {
        let path_str = path.as_ref().to_string_lossy();
        path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH)
    }

    /// Create appropriate connection manager based on path
    ///
    /// Every pooled connection enforces foreign keys (cascading deletes rely
    /// on it) and waits on busy writers instead of failing immediately.
    fn create_connection_manager<P: AsRef<Path>>(path: P, is_memory: bool) -> SqliteConnectionManager {
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path)
        };

        manager.with_init(|conn| {
            conn.execute_batch(&format!(
                "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
                BUSY_TIMEOUT_MS
            ))
        })
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    /// Initialize the database schema
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;

        // No-op for in-memory databases, persistent for files
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .context("Failed to enable WAL journaling")?;

        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;

        Ok(())
    }

    /// Seed the database with test data
    pub fn seed_test_data(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(TEST_DATA)
            .context("Failed to seed test data")?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }
}
