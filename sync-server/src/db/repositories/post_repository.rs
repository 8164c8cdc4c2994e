use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, TransactionBehavior};

use sync_types::{Page, Post};

use crate::db::columns::{is_foreign_key_violation, now_timestamp, timestamp_column};
use crate::db::DbPool;
use crate::error::{SocialError, SocialResult};
use crate::pagination::{fetch_page, ListingQuery, PageWindow};
use crate::permissions::{can_edit, can_post_in_group, ensure};
use crate::visibility::{PostScope, TIMELINE_ORDER};

const POST_SELECT: &str = "SELECT p.id, p.author_id, u.username, p.group_id, p.title, p.content, \
     p.created_at, p.updated_at, p.likes_count";
const POST_FROM: &str = "posts p JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        group_id: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
        likes_count: row.get(8)?,
    })
}

pub(crate) fn find_post(conn: &Connection, post_id: i64) -> SocialResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!("{} FROM {} WHERE p.id = ?1", POST_SELECT, POST_FROM),
            [post_id],
            post_from_row,
        )
        .optional()?;
    Ok(post)
}

pub(crate) fn require_post(conn: &Connection, post_id: i64) -> SocialResult<Post> {
    find_post(conn, post_id)?.ok_or_else(|| SocialError::not_found("Post"))
}

/// Changes accepted by a post edit; `None` leaves the field untouched
#[derive(Debug, Default, Clone)]
pub struct PostChanges<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
}

pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a post, optionally inside a group
    ///
    /// Group posts require the author to hold a membership in that group.
    /// The membership check and the insert share one write transaction.
    pub fn create(
        &self,
        author_id: i64,
        group_id: Option<i64>,
        title: &str,
        content: &str,
    ) -> SocialResult<Post> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(group_id) = group_id {
            let group_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM user_groups WHERE id = ?1)",
                [group_id],
                |row| row.get(0),
            )?;
            if !group_exists {
                return Err(SocialError::not_found("Group"));
            }

            let is_member: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM group_memberships WHERE user_id = ?1 AND group_id = ?2)",
                [author_id, group_id],
                |row| row.get(0),
            )?;
            ensure(
                can_post_in_group(is_member),
                "You must be a member of the group to post.",
            )?;
        }

        let now = now_timestamp();
        let inserted = tx.execute(
            "INSERT INTO posts (author_id, group_id, title, content, created_at, updated_at, likes_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, 0)",
            (author_id, group_id, title, content, &now),
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => return Err(SocialError::not_found("User")),
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to create post").into()),
        }

        let post = require_post(&tx, tx.last_insert_rowid())?;
        tx.commit().context("Failed to commit post")?;

        tracing::info!(
            "User {} created post {} (group: {:?})",
            author_id,
            post.id,
            group_id
        );
        Ok(post)
    }

    /// Get post by ID
    pub fn get_by_id(&self, post_id: i64) -> SocialResult<Option<Post>> {
        let conn = self.pool.get()?;
        find_post(&conn, post_id)
    }

    /// Edit title and/or content; author only
    pub fn update(&self, actor_id: i64, post_id: i64, changes: PostChanges<'_>) -> SocialResult<Post> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let post = require_post(&tx, post_id)?;
        ensure(
            can_edit(actor_id, &post),
            "You don't have permission to edit this post.",
        )?;

        tx.execute(
            "UPDATE posts SET title = COALESCE(?1, title), content = COALESCE(?2, content), updated_at = ?3
             WHERE id = ?4",
            (changes.title, changes.content, now_timestamp(), post_id),
        )
        .context("Failed to update post")?;

        let updated = require_post(&tx, post_id)?;
        tx.commit().context("Failed to commit post update")?;

        tracing::info!("User {} updated post {}", actor_id, post_id);
        Ok(updated)
    }

    /// Delete a post with its comments and likes; author only
    pub fn delete(&self, actor_id: i64, post_id: i64) -> SocialResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let post = require_post(&tx, post_id)?;
        ensure(
            can_edit(actor_id, &post),
            "You don't have permission to delete this post.",
        )?;

        tx.execute("DELETE FROM posts WHERE id = ?1", [post_id])
            .context("Failed to delete post")?;
        tx.commit().context("Failed to commit post deletion")?;

        tracing::info!("User {} deleted post {}", actor_id, post_id);
        Ok(())
    }

    /// One page of a visibility scope, newest first
    pub fn list(&self, scope: PostScope, window: PageWindow) -> SocialResult<Page<Post>> {
        let conn = self.pool.get()?;
        let (filter, param) = scope.filter();

        let query = ListingQuery {
            select: POST_SELECT,
            from: POST_FROM,
            filter: &filter,
            order_by: TIMELINE_ORDER,
        };
        let params: Vec<&dyn ToSql> = match &param {
            Some(value) => vec![value as &dyn ToSql],
            None => Vec::new(),
        };

        tracing::debug!(
            "Listing {} posts (page {}, size {})",
            scope.name(),
            window.page,
            window.page_size
        );
        fetch_page(&conn, &query, &params, window, post_from_row)
    }
}
