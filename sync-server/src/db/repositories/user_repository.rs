use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row};

use sync_types::User;

use crate::db::columns::{is_unique_violation, now_timestamp, timestamp_column};
use crate::db::DbPool;
use crate::error::{SocialError, SocialResult};
use crate::permissions::{can_edit, ensure};

const USER_COLUMNS: &str = "id, username, email, created_at";

pub(crate) fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

pub(crate) fn find_user(conn: &Connection, user_id: i64) -> SocialResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [user_id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a new user; usernames are unique
    pub fn create(&self, username: &str, email: &str) -> SocialResult<User> {
        let conn = self.pool.get()?;

        let inserted = conn.execute(
            "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)",
            (username, email, now_timestamp()),
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(SocialError::Validation(
                    "A user with that username already exists".to_string(),
                ));
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to create user").into()),
        }

        let user_id = conn.last_insert_rowid();
        tracing::info!("Created user {} ({})", username, user_id);

        find_user(&conn, user_id)?
            .context("Created user vanished")
            .map_err(SocialError::from)
    }

    /// Get user by ID
    pub fn get_by_id(&self, user_id: i64) -> SocialResult<Option<User>> {
        let conn = self.pool.get()?;
        find_user(&conn, user_id)
    }

    /// Get user by username
    pub fn get_by_username(&self, username: &str) -> SocialResult<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Resolve a username or fail with `NotFound`
    pub fn require_by_username(&self, username: &str) -> SocialResult<User> {
        self.get_by_username(username)?
            .ok_or_else(|| SocialError::not_found("User"))
    }

    /// Delete an account and, by cascade, everything it owns
    pub fn delete(&self, actor_id: i64, user: &User) -> SocialResult<()> {
        ensure(
            can_edit(actor_id, user),
            "You don't have permission to delete this account.",
        )?;

        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM users WHERE id = ?1", [user.id])
            .context("Failed to delete user")?;
        if rows == 0 {
            return Err(SocialError::not_found("User"));
        }

        tracing::info!("Deleted user {} ({})", user.username, user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup_test_db() -> (Database, UserRepository) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        db.seed_test_data().expect("Failed to seed test data");
        let repo = UserRepository::new(db.pool.clone());
        (db, repo)
    }

    #[test]
    fn test_create_and_lookup() {
        let (_db, repo) = setup_test_db();

        let dave = repo.create("dave", "dave@example.com").unwrap();
        assert_eq!(dave.username, "dave");
        assert!(dave.id > 3, "ids continue after seeded rows");

        let by_name = repo.get_by_username("dave").unwrap().unwrap();
        assert_eq!(by_name, dave);
        let by_id = repo.get_by_id(dave.id).unwrap().unwrap();
        assert_eq!(by_id, dave);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (_db, repo) = setup_test_db();
        let result = repo.create("alice", "other@example.com");
        assert!(matches!(result, Err(SocialError::Validation(_))));
    }

    #[test]
    fn test_require_missing_user() {
        let (_db, repo) = setup_test_db();
        assert!(matches!(
            repo.require_by_username("nobody"),
            Err(SocialError::NotFound(_))
        ));
    }

    #[test]
    fn test_only_self_can_delete_account() {
        let (db, repo) = setup_test_db();
        let charlie = repo.require_by_username("charlie").unwrap();

        let result = repo.delete(1, &charlie);
        assert!(matches!(result, Err(SocialError::Forbidden(_))));

        repo.delete(charlie.id, &charlie).unwrap();
        assert!(repo.get_by_id(charlie.id).unwrap().is_none());

        // Cascades removed charlie's post, comment and follow edge
        let conn = db.connection().unwrap();
        let leftovers: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM posts WHERE author_id = ?1)
                      + (SELECT COUNT(*) FROM comments WHERE author_id = ?1)
                      + (SELECT COUNT(*) FROM follows WHERE follower_id = ?1 OR followed_id = ?1)",
                [charlie.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(leftovers, 0);
    }
}
