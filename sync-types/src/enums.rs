use serde::{Deserialize, Serialize};

/// Role carried by a group membership edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Admin,
    #[default]
    Member,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Admin => "admin",
            MembershipRole::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(MembershipRole::Admin),
            "member" => Some(MembershipRole::Member),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(MembershipRole::parse("ADMIN"), Some(MembershipRole::Admin));
        assert_eq!(MembershipRole::parse("member"), Some(MembershipRole::Member));
        assert_eq!(MembershipRole::parse("owner"), None);
    }

    #[test]
    fn test_default_role_is_member() {
        assert_eq!(MembershipRole::default(), MembershipRole::Member);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&MembershipRole::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }
}
