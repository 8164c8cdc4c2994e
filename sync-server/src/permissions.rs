//! Capability predicates shared by every component that mutates content
//! or relationships. Each predicate takes the acting user explicitly.

use sync_types::{Comment, Group, Post, User};

use crate::error::{SocialError, SocialResult};

/// Something with a single owning user
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Post {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

impl Owned for Group {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

impl Owned for User {
    fn owner_id(&self) -> i64 {
        self.id
    }
}

/// Edit or delete: owner only
pub fn can_edit<T: Owned>(actor_id: i64, item: &T) -> bool {
    actor_id == item.owner_id()
}

/// Comment authors and the owner of the commented post may delete a comment
pub fn can_delete_comment(actor_id: i64, comment: &Comment, post: &Post) -> bool {
    can_edit(actor_id, comment) || can_edit(actor_id, post)
}

/// Posting into a group requires a membership row
pub fn can_post_in_group(is_member: bool) -> bool {
    is_member
}

/// The owner stays in their group until it is deleted
pub fn can_leave_group(actor_id: i64, group: &Group) -> bool {
    !can_edit(actor_id, group)
}

/// Turn a capability check into a `Forbidden` failure
pub fn ensure(allowed: bool, message: &str) -> SocialResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(SocialError::Forbidden(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(author_id: i64) -> Post {
        Post {
            id: 1,
            author_id,
            author_username: "author".to_string(),
            group_id: None,
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            likes_count: 0,
        }
    }

    fn comment(author_id: i64) -> Comment {
        Comment {
            id: 1,
            post_id: 1,
            author_id,
            author_username: "commenter".to_string(),
            content: "c".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn group(owner_id: i64) -> Group {
        Group {
            id: 1,
            name: "g".to_string(),
            description: String::new(),
            owner_id,
            owner_username: "owner".to_string(),
            member_count: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_author_edits_post() {
        assert!(can_edit(1, &post(1)));
        assert!(!can_edit(2, &post(1)));
    }

    #[test]
    fn test_comment_edit_is_author_only() {
        assert!(can_edit(3, &comment(3)));
        // Post owners moderate but do not edit
        assert!(!can_edit(1, &comment(3)));
    }

    #[test]
    fn test_post_owner_may_delete_comments() {
        let p = post(1);
        assert!(can_delete_comment(3, &comment(3), &p));
        assert!(can_delete_comment(1, &comment(3), &p));
        assert!(!can_delete_comment(2, &comment(3), &p));
    }

    #[test]
    fn test_owner_cannot_leave() {
        let g = group(5);
        assert!(!can_leave_group(5, &g));
        assert!(can_leave_group(6, &g));
    }

    #[test]
    fn test_group_posting_requires_membership() {
        assert!(can_post_in_group(true));
        assert!(!can_post_in_group(false));
    }

    #[test]
    fn test_ensure_maps_to_forbidden() {
        assert!(ensure(true, "x").is_ok());
        match ensure(false, "not yours") {
            Err(SocialError::Forbidden(msg)) => assert_eq!(msg, "not yours"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
