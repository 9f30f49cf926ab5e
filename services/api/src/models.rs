//! Domain models and request/response payloads

use serde::Serialize;

pub mod follow;
pub mod loan;
pub mod message;
pub mod post;
pub mod savings;
pub mod user;

/// Pagination metadata returned with list responses
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Build pagination metadata from a 1-based page, page size, and total count
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total as u64).div_ceil(limit as u64) as u32
        };

        Self {
            current_page: page,
            total_pages,
            total,
            has_next: (page as i64) * (limit as i64) < total,
            has_prev: page > 1,
        }
    }
}

/// Clamp caller-supplied pagination to sane bounds and return (page, limit, offset)
pub fn page_bounds(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> (u32, u32, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, 100);
    let offset = (page as i64 - 1) * limit as i64;
    (page, limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_metadata() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(3, 10, 25);
        assert!(!p.has_next);
    }

    #[test]
    fn test_page_bounds_clamps_limit() {
        let (page, limit, offset) = page_bounds(Some(0), Some(500), 20);
        assert_eq!(page, 1);
        assert_eq!(limit, 100);
        assert_eq!(offset, 0);

        let (page, limit, offset) = page_bounds(Some(3), None, 20);
        assert_eq!(page, 3);
        assert_eq!(limit, 20);
        assert_eq!(offset, 40);
    }
}
