use anyhow::Context;
use rusqlite::{Connection, Row, TransactionBehavior};

use sync_types::{Follow, Page};

use crate::db::columns::{
    is_foreign_key_violation, is_unique_violation, now_timestamp, timestamp_column,
};
use crate::db::DbPool;
use crate::error::{SocialError, SocialResult};
use crate::pagination::{fetch_page, ListingQuery, PageWindow};

const FOLLOW_SELECT: &str = "SELECT f.id, f.follower_id, fu.username, f.followed_id, tu.username, f.created_at";
const FOLLOW_FROM: &str = "follows f \
     JOIN users fu ON fu.id = f.follower_id \
     JOIN users tu ON tu.id = f.followed_id";
const FOLLOW_ORDER: &str = "f.created_at DESC, f.id DESC";

fn follow_from_row(row: &Row) -> rusqlite::Result<Follow> {
    Ok(Follow {
        id: row.get(0)?,
        follower_id: row.get(1)?,
        follower_username: row.get(2)?,
        followed_id: row.get(3)?,
        followed_username: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

fn find_follow(conn: &Connection, follow_id: i64) -> SocialResult<Follow> {
    let follow = conn.query_row(
        &format!("{} FROM {} WHERE f.id = ?1", FOLLOW_SELECT, FOLLOW_FROM),
        [follow_id],
        follow_from_row,
    )?;
    Ok(follow)
}

/// Directed follow edges (follower -> followed)
pub struct FollowRepository {
    pool: DbPool,
}

impl FollowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Check if user A is following user B
    pub fn is_following(&self, follower_id: i64, followed_id: i64) -> SocialResult<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2)",
            [follower_id, followed_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Follow a user
    ///
    /// Duplicates are caught by the `UNIQUE (follower_id, followed_id)`
    /// constraint, so of two racing requests exactly one wins.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> SocialResult<Follow> {
        if follower_id == followed_id {
            return Err(SocialError::SelfFollow);
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            "INSERT INTO follows (follower_id, followed_id, created_at) VALUES (?1, ?2, ?3)",
            (follower_id, followed_id, now_timestamp()),
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(SocialError::AlreadyFollowing),
            Err(e) if is_foreign_key_violation(&e) => return Err(SocialError::not_found("User")),
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to follow user").into()),
        }

        let follow = find_follow(&tx, tx.last_insert_rowid())?;
        tx.commit().context("Failed to commit follow")?;

        tracing::info!("User {} followed user {}", follower_id, followed_id);
        Ok(follow)
    }

    /// Unfollow a user
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> SocialResult<()> {
        if follower_id == followed_id {
            return Err(SocialError::SelfFollow);
        }

        let conn = self.pool.get()?;
        let rows_affected = conn
            .execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                [follower_id, followed_id],
            )
            .context("Failed to unfollow user")?;

        if rows_affected == 0 {
            return Err(SocialError::NotFollowing);
        }

        tracing::info!("User {} unfollowed user {}", follower_id, followed_id);
        Ok(())
    }

    /// Edges pointing at this user, newest first
    pub fn followers(&self, user_id: i64, window: PageWindow) -> SocialResult<Page<Follow>> {
        let conn = self.pool.get()?;
        let query = ListingQuery {
            select: FOLLOW_SELECT,
            from: FOLLOW_FROM,
            filter: "WHERE f.followed_id = ?1",
            order_by: FOLLOW_ORDER,
        };
        fetch_page(&conn, &query, &[&user_id], window, follow_from_row)
    }

    /// Edges leaving this user, newest first
    pub fn following(&self, user_id: i64, window: PageWindow) -> SocialResult<Page<Follow>> {
        let conn = self.pool.get()?;
        let query = ListingQuery {
            select: FOLLOW_SELECT,
            from: FOLLOW_FROM,
            filter: "WHERE f.follower_id = ?1",
            order_by: FOLLOW_ORDER,
        };
        fetch_page(&conn, &query, &[&user_id], window, follow_from_row)
    }

    /// Get follower count
    pub fn follower_count(&self, user_id: i64) -> SocialResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE followed_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get following count
    pub fn following_count(&self, user_id: i64) -> SocialResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
