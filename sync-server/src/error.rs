use thiserror::Error;

/// Failures of the social graph and content operations
///
/// Everything except `Storage` is a terminal, caller-resolvable outcome.
/// `Storage` wraps infrastructure failures and must never leak details past
/// the request boundary.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("You have already liked this post")]
    AlreadyLiked,

    #[error("You have not liked this post")]
    NotLiked,

    #[error("You are already following this user")]
    AlreadyFollowing,

    #[error("You are not following this user")]
    NotFollowing,

    #[error("You cannot follow yourself")]
    SelfFollow,

    #[error("You are already a member of this group")]
    AlreadyMember,

    #[error("You are not a member of this group")]
    NotMember,

    #[error("Group owner cannot leave the group directly. Transfer ownership or delete the group.")]
    OwnerCannotLeave,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type SocialResult<T> = Result<T, SocialError>;

impl SocialError {
    pub fn not_found(what: &str) -> Self {
        SocialError::NotFound(format!("{} not found", what))
    }

    /// Relationship invariant violations (duplicate edges, self-follow, owner leave)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SocialError::AlreadyLiked
                | SocialError::NotLiked
                | SocialError::AlreadyFollowing
                | SocialError::SelfFollow
                | SocialError::AlreadyMember
                | SocialError::NotMember
                | SocialError::OwnerCannotLeave
        )
    }
}

impl From<rusqlite::Error> for SocialError {
    fn from(err: rusqlite::Error) -> Self {
        SocialError::Storage(err.into())
    }
}

impl From<r2d2::Error> for SocialError {
    fn from(err: r2d2::Error) -> Self {
        SocialError::Storage(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_family() {
        assert!(SocialError::AlreadyLiked.is_conflict());
        assert!(SocialError::SelfFollow.is_conflict());
        assert!(SocialError::OwnerCannotLeave.is_conflict());
        assert!(!SocialError::NotFollowing.is_conflict());
        assert!(!SocialError::not_found("Post").is_conflict());
        assert!(!SocialError::Forbidden("nope".to_string()).is_conflict());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(SocialError::not_found("Group").to_string(), "Group not found");
    }

    #[test]
    fn test_storage_errors_convert() {
        let err: SocialError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, SocialError::Storage(_)));
    }
}
