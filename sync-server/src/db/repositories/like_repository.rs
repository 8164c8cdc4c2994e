use anyhow::Context;
use rusqlite::{Connection, Row, TransactionBehavior};

use sync_types::{Like, Page};

use crate::db::columns::{is_unique_violation, now_timestamp, timestamp_column};
use crate::db::repositories::post_repository::require_post;
use crate::db::DbPool;
use crate::error::{SocialError, SocialResult};
use crate::pagination::{fetch_page, ListingQuery, PageWindow};

const LIKE_SELECT: &str = "SELECT l.id, l.user_id, u.username, l.post_id, l.created_at";
const LIKE_FROM: &str = "likes l JOIN users u ON u.id = l.user_id";

fn like_from_row(row: &Row) -> rusqlite::Result<Like> {
    Ok(Like {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        post_id: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn find_like(conn: &Connection, like_id: i64) -> SocialResult<Like> {
    let like = conn.query_row(
        &format!("{} FROM {} WHERE l.id = ?1", LIKE_SELECT, LIKE_FROM),
        [like_id],
        like_from_row,
    )?;
    Ok(like)
}

/// Like rows and the `likes_count` counter they back
///
/// The counter is a cache of `COUNT(likes)`. Both are only ever changed
/// together inside one immediate transaction, so readers never observe a
/// like row without its counter bump (or the reverse).
pub struct LikeRepository {
    pool: DbPool,
}

impl LikeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Like a post. A second like by the same user fails with `AlreadyLiked`.
    pub fn like(&self, user_id: i64, post_id: i64) -> SocialResult<Like> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_post(&tx, post_id)?;

        let inserted = tx.execute(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
            (user_id, post_id, now_timestamp()),
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(SocialError::AlreadyLiked),
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to insert like").into()),
        }
        let like_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
            [post_id],
        )
        .context("Failed to increment likes_count")?;

        let like = find_like(&tx, like_id)?;
        tx.commit().context("Failed to commit like")?;

        tracing::info!("User {} liked post {}", user_id, post_id);
        Ok(like)
    }

    /// Remove a like. Fails with `NotLiked` when there is nothing to remove.
    pub fn unlike(&self, user_id: i64, post_id: i64) -> SocialResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_post(&tx, post_id)?;

        let removed = tx
            .execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                [user_id, post_id],
            )
            .context("Failed to delete like")?;
        if removed == 0 {
            return Err(SocialError::NotLiked);
        }

        // Floor at zero; the like rows stay the source of truth
        tx.execute(
            "UPDATE posts SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?1",
            [post_id],
        )
        .context("Failed to decrement likes_count")?;

        tx.commit().context("Failed to commit unlike")?;

        tracing::info!("User {} unliked post {}", user_id, post_id);
        Ok(())
    }

    /// Likes on a post, newest first
    pub fn list_for_post(&self, post_id: i64, window: PageWindow) -> SocialResult<Page<Like>> {
        let conn = self.pool.get()?;
        require_post(&conn, post_id)?;

        let query = ListingQuery {
            select: LIKE_SELECT,
            from: LIKE_FROM,
            filter: "WHERE l.post_id = ?1",
            order_by: "l.created_at DESC, l.id DESC",
        };
        fetch_page(&conn, &query, &[&post_id], window, like_from_row)
    }

    /// Number of like rows for a post, independent of the cached counter
    pub fn count_for_post(&self, post_id: i64) -> SocialResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
            [post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::PostRepository;
    use crate::db::Database;
    use proptest::prelude::*;
    use std::sync::{Arc, Barrier};

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    const CHARLIE: i64 = 3;

    fn setup_test_db() -> (Database, LikeRepository, PostRepository) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        db.seed_test_data().expect("Failed to seed test data");
        let likes = LikeRepository::new(db.pool.clone());
        let posts = PostRepository::new(db.pool.clone());
        (db, likes, posts)
    }

    fn likes_count(posts: &PostRepository, post_id: i64) -> i64 {
        posts.get_by_id(post_id).unwrap().unwrap().likes_count
    }

    #[test]
    fn test_like_unlike_scenario() {
        let (_db, likes, posts) = setup_test_db();
        let post = posts.create(ALICE, None, "P", "content").unwrap();
        assert_eq!(post.likes_count, 0);

        let like = likes.like(BOB, post.id).unwrap();
        assert_eq!(like.username, "bob");
        assert_eq!(likes_count(&posts, post.id), 1);

        assert!(matches!(likes.like(BOB, post.id), Err(SocialError::AlreadyLiked)));
        assert_eq!(likes_count(&posts, post.id), 1);

        likes.unlike(BOB, post.id).unwrap();
        assert_eq!(likes_count(&posts, post.id), 0);
        assert_eq!(likes.count_for_post(post.id).unwrap(), 0);

        assert!(matches!(likes.unlike(BOB, post.id), Err(SocialError::NotLiked)));
        assert_eq!(likes_count(&posts, post.id), 0);
    }

    #[test]
    fn test_like_missing_post() {
        let (_db, likes, _posts) = setup_test_db();
        assert!(matches!(likes.like(BOB, 999), Err(SocialError::NotFound(_))));
        assert!(matches!(likes.unlike(BOB, 999), Err(SocialError::NotFound(_))));
    }

    #[test]
    fn test_counter_floor_at_zero() {
        let (db, likes, posts) = setup_test_db();

        // Simulate a drifted counter: a like row exists but the cache says 0
        let conn = db.connection().unwrap();
        conn.execute("UPDATE posts SET likes_count = 0 WHERE id = 1", []).unwrap();
        drop(conn);

        likes.unlike(BOB, 1).unwrap();
        assert_eq!(likes_count(&posts, 1), 0);
    }

    #[test]
    fn test_list_for_post_newest_first() {
        let (_db, likes, _posts) = setup_test_db();
        likes.like(CHARLIE, 1).unwrap();
        likes.like(ALICE, 1).unwrap();

        let page = likes.list_for_post(1, PageWindow::first(10)).unwrap();
        let names: Vec<&str> = page.results.iter().map(|l| l.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "charlie", "bob"]);
        assert_eq!(page.count, 3);
    }

    #[test]
    fn test_concurrent_duplicate_likes_yield_one_success() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("likes.db")).unwrap();
        db.initialize().unwrap();
        db.seed_test_data().unwrap();

        let workers = 8;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let pool = db.pool.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let likes = LikeRepository::new(pool);
                    barrier.wait();
                    likes.like(CHARLIE, 2)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(SocialError::AlreadyLiked)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, workers - 1);

        let posts = PostRepository::new(db.pool.clone());
        assert_eq!(likes_count(&posts, 2), 1);
    }

    #[test]
    fn test_concurrent_distinct_likes_lose_no_updates() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("likes.db")).unwrap();
        db.initialize().unwrap();
        db.seed_test_data().unwrap();

        let users = crate::db::repositories::UserRepository::new(db.pool.clone());
        let likers: Vec<i64> = (0..6)
            .map(|i| users.create(&format!("liker{}", i), &format!("l{}@example.com", i)).unwrap().id)
            .collect();

        let handles: Vec<_> = likers
            .into_iter()
            .map(|user_id| {
                let pool = db.pool.clone();
                std::thread::spawn(move || LikeRepository::new(pool).like(user_id, 4))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let posts = PostRepository::new(db.pool.clone());
        let likes = LikeRepository::new(db.pool.clone());
        assert_eq!(likes_count(&posts, 4), 6);
        assert_eq!(likes.count_for_post(4).unwrap(), 6);
    }

    // Any interleaving of like/unlike calls keeps the cached counter equal
    // to the number of like rows.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn prop_likes_count_matches_like_rows(
            ops in prop::collection::vec((1i64..=3, any::<bool>()), 1..30),
        ) {
            let (_db, likes, posts) = setup_test_db();
            let post = posts.create(ALICE, None, "P", "content").unwrap();

            for (user_id, is_like) in ops {
                let _ = if is_like {
                    likes.like(user_id, post.id).map(|_| ())
                } else {
                    likes.unlike(user_id, post.id)
                };
                let cached = likes_count(&posts, post.id);
                prop_assert!(cached >= 0);
                prop_assert_eq!(cached, likes.count_for_post(post.id).unwrap());
            }
        }
    }
}
