//! Pagination state of the portal's result grid.

use serde::{Deserialize, Serialize};

/// Fixed page size the portal serves.
pub const RESULTS_PER_PAGE: u32 = 50;

/// Compute the global serial number of a record (1-based).
pub fn serial_number(page_number: u32, index_within_page: usize) -> u64 {
    let page = u64::from(page_number.max(1));
    (page - 1) * u64::from(RESULTS_PER_PAGE) + index_within_page as u64 + 1
}

/// Total pages needed for `total_count` results.
pub fn total_pages(total_count: u64) -> u32 {
    total_count.div_ceil(u64::from(RESULTS_PER_PAGE)) as u32
}

/// Pagination signals read from the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    /// Total result count; 0 means unknown, not empty.
    pub total_count: u64,
    pub results_per_page: u32,
    pub current_page: u32,
    pub total_pages: u32,
}

impl PaginationState {
    pub fn new(total_count: u64, current_page: u32) -> Self {
        Self {
            total_count,
            results_per_page: RESULTS_PER_PAGE,
            current_page: current_page.max(1),
            total_pages: total_pages(total_count),
        }
    }

    /// True when the total count could not be read from the page.
    pub fn is_unknown(&self) -> bool {
        self.total_count == 0
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(120), 3);
        assert_eq!(total_pages(100), 2);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(0), 0);
    }

    #[test]
    fn test_serial_number() {
        assert_eq!(serial_number(1, 0), 1);
        assert_eq!(serial_number(1, 49), 50);
        assert_eq!(serial_number(3, 19), 120);
    }

    #[test]
    fn test_state_defaults() {
        let state = PaginationState::default();
        assert_eq!(state.current_page, 1);
        assert_eq!(state.results_per_page, 50);
        assert!(state.is_unknown());

        let state = PaginationState::new(120, 0);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 3);
    }
}
