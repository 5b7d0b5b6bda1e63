//! Zero-based page requests
//!
//! `current_page` is a zero-based page index: page 0 is the first page.
//!
//! ```rust
//! use catalog_engine::query::PageRequest;
//!
//! let page = PageRequest::new(20, 2).unwrap();
//! assert_eq!(page.skip(), 40);
//! assert_eq!(page.limit(), 20);
//! ```

use serde::{Deserialize, Serialize};

/// Pagination parameters
///
/// Deserialization goes through [`PageRequest::new`], so a zero page size is
/// rejected on the wire too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPageRequest")]
pub struct PageRequest {
    /// Number of items per page; always positive
    page_size: u64,
    /// Zero-based page index
    current_page: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageRequest {
    page_size: u64,
    #[serde(default)]
    current_page: u64,
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = String;

    fn try_from(raw: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(raw.page_size, raw.current_page)
            .ok_or_else(|| "pageSize must be a positive integer".to_string())
    }
}

impl PageRequest {
    /// Create a page request
    ///
    /// Returns `None` when `page_size` is zero.
    #[must_use]
    pub const fn new(page_size: u64, current_page: u64) -> Option<Self> {
        if page_size == 0 {
            return None;
        }
        Some(Self {
            page_size,
            current_page,
        })
    }

    /// The first page with the given size
    #[must_use]
    pub const fn first_page(page_size: u64) -> Option<Self> {
        Self::new(page_size, 0)
    }

    /// Items per page
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Zero-based page index
    #[must_use]
    pub const fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Documents to skip: `page_size * current_page`, saturating
    #[must_use]
    pub const fn skip(&self) -> u64 {
        self.page_size.saturating_mul(self.current_page)
    }

    /// Documents to return
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_zero_is_first_page() {
        let page = PageRequest::new(10, 0).unwrap();
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), 10);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(PageRequest::new(0, 3).is_none());
        assert!(PageRequest::first_page(0).is_none());
    }

    #[test]
    fn test_skip_saturates() {
        let page = PageRequest::new(u64::MAX, 2).unwrap();
        assert_eq!(page.skip(), u64::MAX);
    }

    #[test]
    fn test_serde_camel_case() {
        let page: PageRequest =
            serde_json::from_value(json!({ "pageSize": 2, "currentPage": 1 })).unwrap();
        assert_eq!(page, PageRequest::new(2, 1).unwrap());

        let page: PageRequest = serde_json::from_value(json!({ "pageSize": 5 })).unwrap();
        assert_eq!(page.current_page(), 0);
    }

    #[test]
    fn test_serde_rejects_zero_page_size() {
        let err = serde_json::from_value::<PageRequest>(json!({ "pageSize": 0 })).unwrap_err();
        assert!(err.to_string().contains("pageSize must be a positive integer"));
        assert!(serde_json::from_value::<PageRequest>(json!({ "pageSize": 0, "currentPage": 2 })).is_err());
    }
}
