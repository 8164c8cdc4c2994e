use crate::db::columns::{now_timestamp, to_db_timestamp};
use crate::db::Database;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

/// Database-backed session manager for token authentication
///
/// Tokens are UUID v4 strings mapped to a user id with an expiry. Expired
/// sessions are removed when they are next presented and in bulk at startup.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(db: Database, ttl_days: i64) -> Self {
        Self {
            db,
            ttl: Duration::days(ttl_days.max(1)),
        }
    }

    /// Create a new session for a user and return its token
    pub fn create_session(&self, user_id: i64) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let expires_at = created_at + self.ttl;

        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                token,
                user_id,
                to_db_timestamp(&created_at),
                to_db_timestamp(&expires_at),
            ],
        )
        .context("Failed to create session")?;

        tracing::info!("Created session for user {}", user_id);
        Ok(token)
    }

    /// Resolve a token to its user id
    ///
    /// Returns `Ok(None)` for unknown or expired tokens; an expired token is
    /// deleted on the way out.
    pub fn validate_session(&self, token: &str) -> Result<Option<i64>> {
        let conn = self.db.connection()?;

        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token = ?1",
                rusqlite::params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to look up session")?;

        let Some((user_id, expires_at_str)) = row else {
            return Ok(None);
        };

        let expires_at = DateTime::parse_from_rfc3339(&expires_at_str)
            .context("Failed to parse expiry time")?
            .with_timezone(&Utc);

        if Utc::now() > expires_at {
            conn.execute("DELETE FROM sessions WHERE token = ?1", rusqlite::params![token])
                .context("Failed to delete expired session")?;
            tracing::debug!("Rejected expired session for user {}", user_id);
            return Ok(None);
        }

        Ok(Some(user_id))
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.db.connection()?;
        let rows_affected = conn
            .execute("DELETE FROM sessions WHERE token = ?1", rusqlite::params![token])
            .context("Failed to delete session")?;

        if rows_affected > 0 {
            tracing::info!("Deleted session");
        }

        Ok(())
    }

    /// Remove every session past its expiry; returns how many were deleted
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.db.connection()?;

        let rows_affected = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                rusqlite::params![now_timestamp()],
            )
            .context("Failed to cleanup expired sessions")?;

        if rows_affected > 0 {
            tracing::info!("Cleaned up {} expired sessions", rows_affected);
        }

        Ok(rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOB: i64 = 2;

    fn setup_test_db() -> Database {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        db.seed_test_data().expect("Failed to seed test data");
        db
    }

    fn expire(db: &Database, token: &str) {
        let conn = db.connection().expect("Failed to get connection");
        conn.execute(
            "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
            rusqlite::params![to_db_timestamp(&(Utc::now() - Duration::days(1))), token],
        )
        .expect("Failed to expire session");
    }

    #[test]
    fn test_create_and_validate_session() {
        let manager = SessionManager::new(setup_test_db(), 30);

        let token = manager.create_session(BOB).expect("Failed to create session");
        assert!(Uuid::parse_str(&token).is_ok(), "Token should be a valid UUID");
        assert_eq!(manager.validate_session(&token).unwrap(), Some(BOB));
    }

    #[test]
    fn test_unknown_token() {
        let manager = SessionManager::new(setup_test_db(), 30);
        assert_eq!(manager.validate_session("invalid-token").unwrap(), None);
    }

    #[test]
    fn test_delete_session() {
        let manager = SessionManager::new(setup_test_db(), 30);

        let token = manager.create_session(BOB).unwrap();
        manager.delete_session(&token).unwrap();
        assert_eq!(manager.validate_session(&token).unwrap(), None);
    }

    #[test]
    fn test_expired_session_is_rejected_and_removed() {
        let db = setup_test_db();
        let manager = SessionManager::new(db.clone(), 30);

        let token = manager.create_session(BOB).unwrap();
        expire(&db, &token);

        assert_eq!(manager.validate_session(&token).unwrap(), None);
        assert_eq!(manager.cleanup_expired_sessions().unwrap(), 0);
    }

    #[test]
    fn test_cleanup_expired_sessions() {
        let db = setup_test_db();
        let manager = SessionManager::new(db.clone(), 30);

        let stale = manager.create_session(BOB).unwrap();
        let fresh = manager.create_session(BOB).unwrap();
        assert_ne!(stale, fresh);
        expire(&db, &stale);

        assert_eq!(manager.cleanup_expired_sessions().unwrap(), 1);
        assert_eq!(manager.validate_session(&fresh).unwrap(), Some(BOB));
    }
}
