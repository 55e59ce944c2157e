//! Pagination query parameters shared by the list endpoints

use database_layer::PageRequest;
use serde::Deserialize;

/// `?page=&limit=&search=` on list endpoints.
///
/// Missing or zero values fall back to page 1 with 10 rows; the page size is
/// capped at 100.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

impl PaginationParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    /// The search term, if one was given and is not blank.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        let request = params.page_request();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_pagination_with_values() {
        let params = PaginationParams {
            page: Some(3),
            limit: Some(25),
            search: None,
        };
        let request = params.page_request();
        assert_eq!(request.page, 3);
        assert_eq!(request.offset(), 50);
    }

    #[test]
    fn test_page_size_is_capped() {
        let params = PaginationParams {
            page: Some(0),
            limit: Some(1000),
            search: None,
        };
        let request = params.page_request();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 100);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let params = PaginationParams {
            search: Some("   ".to_string()),
            ..PaginationParams::default()
        };
        assert_eq!(params.search(), None);

        let params = PaginationParams {
            search: Some(" siti ".to_string()),
            ..PaginationParams::default()
        };
        assert_eq!(params.search(), Some("siti"));
    }
}
