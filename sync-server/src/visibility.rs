//! Post visibility scopes
//!
//! Every post listing is the same query (posts joined with their author,
//! ordered newest first) filtered by one of the scopes below. The timeline
//! order is `(created_at DESC, id DESC)`; the id tie-break makes it a total
//! order so page boundaries are stable across requests.

/// Authors visible in a viewer's feed: the viewer plus everyone they follow
const FOLLOWING_SET: &str =
    "(SELECT ?1 UNION SELECT followed_id FROM follows WHERE follower_id = ?1)";

pub(crate) const TIMELINE_ORDER: &str = "p.created_at DESC, p.id DESC";

/// Which posts a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Every post
    All,
    /// Posts by the viewer or anyone the viewer follows
    Feed { viewer: i64 },
    /// Posts by anyone outside the viewer's following set (complement of Feed)
    Explore { viewer: i64 },
    /// Posts inside a group, readable by any caller
    Group(i64),
    /// Posts written by one user
    Author(i64),
}

impl PostScope {
    /// SQL filter over `posts p` and the value bound to `?1`, if any
    pub(crate) fn filter(&self) -> (String, Option<i64>) {
        match *self {
            PostScope::All => (String::new(), None),
            PostScope::Feed { viewer } => {
                (format!("WHERE p.author_id IN {}", FOLLOWING_SET), Some(viewer))
            }
            PostScope::Explore { viewer } => (
                format!("WHERE p.author_id NOT IN {}", FOLLOWING_SET),
                Some(viewer),
            ),
            PostScope::Group(group_id) => ("WHERE p.group_id = ?1".to_string(), Some(group_id)),
            PostScope::Author(author_id) => {
                ("WHERE p.author_id = ?1".to_string(), Some(author_id))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PostScope::All => "all",
            PostScope::Feed { .. } => "feed",
            PostScope::Explore { .. } => "explore",
            PostScope::Group(_) => "group",
            PostScope::Author(_) => "author",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_and_explore_share_following_set() {
        let (feed, feed_param) = PostScope::Feed { viewer: 4 }.filter();
        let (explore, explore_param) = PostScope::Explore { viewer: 4 }.filter();

        assert!(feed.contains(FOLLOWING_SET));
        assert!(explore.contains(FOLLOWING_SET));
        assert!(explore.contains("NOT IN"));
        assert_eq!(feed_param, Some(4));
        assert_eq!(explore_param, Some(4));
    }

    #[test]
    fn test_all_scope_is_unfiltered() {
        let (filter, param) = PostScope::All.filter();
        assert!(filter.is_empty());
        assert_eq!(param, None);
    }

    #[test]
    fn test_group_scope_binds_group() {
        let (filter, param) = PostScope::Group(9).filter();
        assert_eq!(filter, "WHERE p.group_id = ?1");
        assert_eq!(param, Some(9));
    }
}
