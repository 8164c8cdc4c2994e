use serde::{Deserialize, Serialize};

/// Query string accepted by every paginated listing (`?page=N`, 1-based)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1)
    }
}

/// Page envelope returned by listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of items across all pages
    pub count: u64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_page_defaults_to_first() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page_number(), 1);
    }

    #[test]
    fn test_page_serializes_null_markers() {
        let page = Page {
            count: 2,
            next: None,
            previous: None,
            results: vec![1, 2],
        };
        let value = serde_json::to_value(&page).unwrap();
        assert!(value["next"].is_null());
        assert_eq!(value["results"], serde_json::json!([1, 2]));
    }
}
