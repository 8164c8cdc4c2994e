use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::MembershipRole;

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// User with relationship counters as seen by a viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    /// Edges where this user is the followed side
    pub followers_count: usize,
    /// Edges where this user is the follower side
    pub following_count: usize,
    /// Whether the viewer follows this user
    pub is_following: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    /// None for posts in the global stream
    #[serde(default)]
    pub group_id: Option<i64>,
    pub title: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
    /// Cached count of Like rows for this post
    pub likes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub post_id: i64,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// Directed follow edge: follower -> followed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub follower_username: String,
    pub followed_id: i64,
    pub followed_username: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub owner_username: String,
    pub member_count: i64,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub group_id: i64,
    pub role: MembershipRole,
    #[serde(with = "datetime_format")]
    pub date_joined: DateTime<Utc>,
}

// Request/Response types for API
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub group_id: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub session_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_user_detail_flattens_user_fields() {
        let detail = UserDetail {
            user: sample_user(),
            followers_count: 2,
            following_count: 1,
            is_following: true,
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["username"], "alice");
        assert_eq!(value["followers_count"], 2);
        assert_eq!(value["is_following"], true);
        assert!(value.get("user").is_none());
    }

    #[test]
    fn test_create_post_request_group_is_optional() {
        let req: CreatePostRequest =
            serde_json::from_str(r#"{"title":"Hi","content":"there"}"#).unwrap();
        assert_eq!(req.group_id, None);

        let req: CreatePostRequest =
            serde_json::from_str(r#"{"title":"Hi","content":"there","group_id":3}"#).unwrap();
        assert_eq!(req.group_id, Some(3));
    }

    #[test]
    fn test_update_post_request_is_partial() {
        let req: UpdatePostRequest = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("New"));
        assert!(req.content.is_none());
    }

    #[test]
    fn test_timestamps_serialize_as_rfc3339() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(value["created_at"], "2024-01-01T00:00:00+00:00");
    }
}
