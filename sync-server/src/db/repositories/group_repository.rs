use anyhow::Context;
use rusqlite::{types::Type, Connection, OptionalExtension, Row, TransactionBehavior};

use sync_types::{Group, GroupMembership, MembershipRole, Page};

use crate::db::columns::{
    is_foreign_key_violation, is_unique_violation, now_timestamp, timestamp_column,
};
use crate::db::DbPool;
use crate::error::{SocialError, SocialResult};
use crate::pagination::{fetch_page, ListingQuery, PageWindow};
use crate::permissions::{can_edit, can_leave_group, ensure};

const GROUP_SELECT: &str = "SELECT g.id, g.name, g.description, g.owner_id, u.username, \
     (SELECT COUNT(*) FROM group_memberships m WHERE m.group_id = g.id), g.created_at";
const GROUP_FROM: &str = "user_groups g JOIN users u ON u.id = g.owner_id";

const MEMBER_SELECT: &str = "SELECT m.id, m.user_id, u.username, m.group_id, m.role, m.date_joined";
const MEMBER_FROM: &str = "group_memberships m JOIN users u ON u.id = m.user_id";

fn group_from_row(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
        owner_username: row.get(4)?,
        member_count: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

fn membership_from_row(row: &Row) -> rusqlite::Result<GroupMembership> {
    let role_text: String = row.get(4)?;
    let role = MembershipRole::parse(&role_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown membership role '{}'", role_text).into(),
        )
    })?;
    Ok(GroupMembership {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        group_id: row.get(3)?,
        role,
        date_joined: timestamp_column(row, 5)?,
    })
}

fn find_group(conn: &Connection, group_id: i64) -> SocialResult<Option<Group>> {
    let group = conn
        .query_row(
            &format!("{} FROM {} WHERE g.id = ?1", GROUP_SELECT, GROUP_FROM),
            [group_id],
            group_from_row,
        )
        .optional()?;
    Ok(group)
}

fn require_group(conn: &Connection, group_id: i64) -> SocialResult<Group> {
    find_group(conn, group_id)?.ok_or_else(|| SocialError::not_found("Group"))
}

fn find_membership(conn: &Connection, membership_id: i64) -> SocialResult<GroupMembership> {
    let membership = conn.query_row(
        &format!("{} FROM {} WHERE m.id = ?1", MEMBER_SELECT, MEMBER_FROM),
        [membership_id],
        membership_from_row,
    )?;
    Ok(membership)
}

fn insert_membership(
    conn: &Connection,
    user_id: i64,
    group_id: i64,
    role: MembershipRole,
) -> SocialResult<GroupMembership> {
    let inserted = conn.execute(
        "INSERT INTO group_memberships (user_id, group_id, role, date_joined) VALUES (?1, ?2, ?3, ?4)",
        (user_id, group_id, role.as_str(), now_timestamp()),
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(SocialError::AlreadyMember),
        Err(e) if is_foreign_key_violation(&e) => return Err(SocialError::not_found("User")),
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to join group").into()),
    }
    find_membership(conn, conn.last_insert_rowid())
}

/// Changes accepted by a group edit; `None` leaves the field untouched
#[derive(Debug, Default, Clone)]
pub struct GroupChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Groups and their membership edges
///
/// The owner is fixed at creation and always holds an admin membership.
pub struct GroupRepository {
    pool: DbPool,
}

impl GroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a group and enrol its owner as admin in the same transaction
    pub fn create(&self, owner_id: i64, name: &str, description: &str) -> SocialResult<Group> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO user_groups (name, description, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            (name, description, owner_id, now_timestamp()),
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => return Err(SocialError::not_found("User")),
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to create group").into()),
        }
        let group_id = tx.last_insert_rowid();

        insert_membership(&tx, owner_id, group_id, MembershipRole::Admin)?;

        let group = require_group(&tx, group_id)?;
        tx.commit().context("Failed to commit group")?;

        tracing::info!("User {} created group {} ({})", owner_id, group.name, group.id);
        Ok(group)
    }

    pub fn get_by_id(&self, group_id: i64) -> SocialResult<Option<Group>> {
        let conn = self.pool.get()?;
        find_group(&conn, group_id)
    }

    /// All groups, newest first
    pub fn list(&self, window: PageWindow) -> SocialResult<Page<Group>> {
        let conn = self.pool.get()?;
        let query = ListingQuery {
            select: GROUP_SELECT,
            from: GROUP_FROM,
            filter: "",
            order_by: "g.created_at DESC, g.id DESC",
        };
        fetch_page(&conn, &query, &[], window, group_from_row)
    }

    /// Rename or re-describe a group; owner only
    pub fn update(
        &self,
        actor_id: i64,
        group_id: i64,
        changes: GroupChanges<'_>,
    ) -> SocialResult<Group> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group = require_group(&tx, group_id)?;
        ensure(
            can_edit(actor_id, &group),
            "You don't have permission to edit this group.",
        )?;

        tx.execute(
            "UPDATE user_groups SET name = COALESCE(?1, name), description = COALESCE(?2, description)
             WHERE id = ?3",
            (changes.name, changes.description, group_id),
        )
        .context("Failed to update group")?;

        let updated = require_group(&tx, group_id)?;
        tx.commit().context("Failed to commit group update")?;

        tracing::info!("User {} updated group {}", actor_id, group_id);
        Ok(updated)
    }

    /// Delete a group with its memberships and posts; owner only
    pub fn delete(&self, actor_id: i64, group_id: i64) -> SocialResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group = require_group(&tx, group_id)?;
        ensure(
            can_edit(actor_id, &group),
            "You don't have permission to delete this group.",
        )?;

        tx.execute("DELETE FROM user_groups WHERE id = ?1", [group_id])
            .context("Failed to delete group")?;
        tx.commit().context("Failed to commit group deletion")?;

        tracing::info!("User {} deleted group {}", actor_id, group_id);
        Ok(())
    }

    /// Join as a regular member
    pub fn join(&self, user_id: i64, group_id: i64) -> SocialResult<GroupMembership> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_group(&tx, group_id)?;
        let membership = insert_membership(&tx, user_id, group_id, MembershipRole::Member)?;
        tx.commit().context("Failed to commit group join")?;

        tracing::info!("User {} joined group {}", user_id, group_id);
        Ok(membership)
    }

    /// Leave a group. The owner can never leave, member or not.
    pub fn leave(&self, user_id: i64, group_id: i64) -> SocialResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group = require_group(&tx, group_id)?;
        if !can_leave_group(user_id, &group) {
            return Err(SocialError::OwnerCannotLeave);
        }

        let removed = tx
            .execute(
                "DELETE FROM group_memberships WHERE user_id = ?1 AND group_id = ?2",
                [user_id, group_id],
            )
            .context("Failed to leave group")?;
        if removed == 0 {
            return Err(SocialError::NotMember);
        }
        tx.commit().context("Failed to commit group leave")?;

        tracing::info!("User {} left group {}", user_id, group_id);
        Ok(())
    }

    /// Membership edges of a group, most recently joined first
    pub fn members(&self, group_id: i64, window: PageWindow) -> SocialResult<Page<GroupMembership>> {
        let conn = self.pool.get()?;
        require_group(&conn, group_id)?;

        let query = ListingQuery {
            select: MEMBER_SELECT,
            from: MEMBER_FROM,
            filter: "WHERE m.group_id = ?1",
            order_by: "m.date_joined DESC, m.id DESC",
        };
        fetch_page(&conn, &query, &[&group_id], window, membership_from_row)
    }

    pub fn is_member(&self, user_id: i64, group_id: i64) -> SocialResult<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM group_memberships WHERE user_id = ?1 AND group_id = ?2)",
            [user_id, group_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::PostRepository;
    use crate::db::Database;
    use crate::visibility::PostScope;
    use proptest::prelude::*;

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    const CHARLIE: i64 = 3;
    const RUSTACEANS: i64 = 1;

    fn setup_test_db() -> (Database, GroupRepository) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        db.seed_test_data().expect("Failed to seed test data");
        let repo = GroupRepository::new(db.pool.clone());
        (db, repo)
    }

    #[test]
    fn test_unknown_role_is_a_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row(
            "SELECT 1, 2, 'bob', 1, 'owner', '2024-01-07T00:00:00.000000Z'",
            [],
            membership_from_row,
        );
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(4, Type::Text, _))
        ));
    }

    #[test]
    fn test_create_enrols_owner_as_admin() {
        let (_db, repo) = setup_test_db();

        let group = repo.create(CHARLIE, "Gardeners", "").unwrap();
        assert_eq!(group.owner_username, "charlie");
        assert_eq!(group.member_count, 1);

        let members = repo.members(group.id, PageWindow::first(20)).unwrap();
        assert_eq!(members.count, 1);
        assert_eq!(members.results[0].user_id, CHARLIE);
        assert_eq!(members.results[0].role, MembershipRole::Admin);
    }

    #[test]
    fn test_group_scenario() {
        let (db, repo) = setup_test_db();
        let posts = PostRepository::new(db.pool.clone());
        let group = repo.create(ALICE, "G", "desc").unwrap();

        // Not a member yet
        let denied = posts.create(CHARLIE, Some(group.id), "t", "c");
        assert!(matches!(denied, Err(SocialError::Forbidden(_))));

        let membership = repo.join(CHARLIE, group.id).unwrap();
        assert_eq!(membership.role, MembershipRole::Member);
        assert!(matches!(repo.join(CHARLIE, group.id), Err(SocialError::AlreadyMember)));

        let post = posts.create(CHARLIE, Some(group.id), "t", "c").unwrap();
        assert_eq!(post.group_id, Some(group.id));

        let listed = posts
            .list(PostScope::Group(group.id), PageWindow::first(10))
            .unwrap();
        assert_eq!(listed.results.len(), 1);

        assert!(matches!(repo.leave(ALICE, group.id), Err(SocialError::OwnerCannotLeave)));
        repo.leave(CHARLIE, group.id).unwrap();
        assert!(matches!(repo.leave(CHARLIE, group.id), Err(SocialError::NotMember)));

        // Posts written while a member stay in the group
        assert!(posts.get_by_id(post.id).unwrap().is_some());
    }

    #[test]
    fn test_owner_cannot_leave_even_without_membership() {
        let (db, repo) = setup_test_db();
        let conn = db.connection().unwrap();
        conn.execute(
            "DELETE FROM group_memberships WHERE user_id = ?1 AND group_id = ?2",
            [ALICE, RUSTACEANS],
        )
        .unwrap();
        drop(conn);

        assert!(matches!(repo.leave(ALICE, RUSTACEANS), Err(SocialError::OwnerCannotLeave)));
    }

    #[test]
    fn test_missing_group() {
        let (_db, repo) = setup_test_db();
        assert!(matches!(repo.join(BOB, 404), Err(SocialError::NotFound(_))));
        assert!(matches!(repo.leave(BOB, 404), Err(SocialError::NotFound(_))));
        assert!(matches!(
            repo.members(404, PageWindow::first(20)),
            Err(SocialError::NotFound(_))
        ));
    }

    #[test]
    fn test_only_owner_updates_and_deletes() {
        let (db, repo) = setup_test_db();

        let changes = GroupChanges {
            name: Some("Crabs"),
            description: None,
        };
        assert!(matches!(
            repo.update(BOB, RUSTACEANS, changes.clone()),
            Err(SocialError::Forbidden(_))
        ));
        let updated = repo.update(ALICE, RUSTACEANS, changes).unwrap();
        assert_eq!(updated.name, "Crabs");
        assert_eq!(updated.description, "Talk about Rust");

        assert!(matches!(repo.delete(BOB, RUSTACEANS), Err(SocialError::Forbidden(_))));
        repo.delete(ALICE, RUSTACEANS).unwrap();
        assert!(repo.get_by_id(RUSTACEANS).unwrap().is_none());

        // Group posts go with the group
        let posts = PostRepository::new(db.pool.clone());
        assert!(posts.get_by_id(3).unwrap().is_none());
    }

    #[test]
    fn test_members_most_recent_first() {
        let (_db, repo) = setup_test_db();
        repo.join(CHARLIE, RUSTACEANS).unwrap();

        let members = repo.members(RUSTACEANS, PageWindow::first(20)).unwrap();
        let ids: Vec<i64> = members.results.iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec![CHARLIE, BOB, ALICE]);
        assert!(repo.is_member(CHARLIE, RUSTACEANS).unwrap());
    }

    #[test]
    fn test_list_newest_first() {
        let (_db, repo) = setup_test_db();
        let newer = repo.create(BOB, "Newer", "").unwrap();

        let page = repo.list(PageWindow::first(10)).unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].id, newer.id);
        assert_eq!(page.results[1].id, RUSTACEANS);
        assert_eq!(page.results[1].member_count, 2);
    }

    // Whatever join/leave sequence runs, the owner keeps an admin membership
    // and the member count matches the membership rows.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn prop_owner_always_remains_member(
            ops in prop::collection::vec((1i64..=3, any::<bool>()), 0..20),
        ) {
            let (_db, repo) = setup_test_db();
            for (user_id, join) in ops {
                let _ = if join {
                    repo.join(user_id, RUSTACEANS).map(|_| ())
                } else {
                    repo.leave(user_id, RUSTACEANS)
                };
            }

            prop_assert!(repo.is_member(ALICE, RUSTACEANS).unwrap());
            let group = repo.get_by_id(RUSTACEANS).unwrap().unwrap();
            let members = repo.members(RUSTACEANS, PageWindow::first(20)).unwrap();
            prop_assert_eq!(group.member_count as u64, members.count);
        }
    }
}
