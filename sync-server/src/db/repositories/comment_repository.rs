use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use sync_types::{Comment, Page};

use crate::db::columns::{is_foreign_key_violation, now_timestamp, timestamp_column};
use crate::db::repositories::post_repository::require_post;
use crate::db::DbPool;
use crate::error::{SocialError, SocialResult};
use crate::pagination::{fetch_page, ListingQuery, PageWindow};
use crate::permissions::{can_delete_comment, can_edit, ensure};

const COMMENT_SELECT: &str =
    "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at, c.updated_at";
const COMMENT_FROM: &str = "comments c JOIN users u ON u.id = c.author_id";

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get(3)?,
        content: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

fn find_comment(conn: &Connection, comment_id: i64) -> SocialResult<Option<Comment>> {
    let comment = conn
        .query_row(
            &format!("{} FROM {} WHERE c.id = ?1", COMMENT_SELECT, COMMENT_FROM),
            [comment_id],
            comment_from_row,
        )
        .optional()?;
    Ok(comment)
}

fn require_comment(conn: &Connection, comment_id: i64) -> SocialResult<Comment> {
    find_comment(conn, comment_id)?.ok_or_else(|| SocialError::not_found("Comment"))
}

pub struct CommentRepository {
    pool: DbPool,
}

impl CommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Comment on an existing post
    pub fn create(&self, author_id: i64, post_id: i64, content: &str) -> SocialResult<Comment> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_post(&tx, post_id)?;

        let now = now_timestamp();
        let inserted = tx.execute(
            "INSERT INTO comments (post_id, author_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            (post_id, author_id, content, &now),
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => return Err(SocialError::not_found("User")),
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to create comment").into()),
        }

        let comment = require_comment(&tx, tx.last_insert_rowid())?;
        tx.commit().context("Failed to commit comment")?;

        tracing::info!(
            "User {} commented on post {} (comment {})",
            author_id,
            post_id,
            comment.id
        );
        Ok(comment)
    }

    pub fn get_by_id(&self, comment_id: i64) -> SocialResult<Option<Comment>> {
        let conn = self.pool.get()?;
        find_comment(&conn, comment_id)
    }

    /// Comments under a post, newest first
    pub fn list_for_post(&self, post_id: i64, window: PageWindow) -> SocialResult<Page<Comment>> {
        let conn = self.pool.get()?;
        require_post(&conn, post_id)?;

        let query = ListingQuery {
            select: COMMENT_SELECT,
            from: COMMENT_FROM,
            filter: "WHERE c.post_id = ?1",
            order_by: "c.created_at DESC, c.id DESC",
        };
        fetch_page(&conn, &query, &[&post_id], window, comment_from_row)
    }

    /// Rewrite a comment; author only
    pub fn update(&self, actor_id: i64, comment_id: i64, content: &str) -> SocialResult<Comment> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let comment = require_comment(&tx, comment_id)?;
        ensure(
            can_edit(actor_id, &comment),
            "You don't have permission to edit this comment.",
        )?;

        tx.execute(
            "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
            (content, now_timestamp(), comment_id),
        )
        .context("Failed to update comment")?;

        let updated = require_comment(&tx, comment_id)?;
        tx.commit().context("Failed to commit comment update")?;

        tracing::info!("User {} updated comment {}", actor_id, comment_id);
        Ok(updated)
    }

    /// Remove a comment. The comment author and the post owner may both do this.
    pub fn delete(&self, actor_id: i64, comment_id: i64) -> SocialResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let comment = require_comment(&tx, comment_id)?;
        let post = require_post(&tx, comment.post_id)?;
        ensure(
            can_delete_comment(actor_id, &comment, &post),
            "You don't have permission to delete this comment.",
        )?;

        tx.execute("DELETE FROM comments WHERE id = ?1", [comment_id])
            .context("Failed to delete comment")?;
        tx.commit().context("Failed to commit comment deletion")?;

        tracing::info!("User {} deleted comment {}", actor_id, comment_id);
        Ok(())
    }
}
