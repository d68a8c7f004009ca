//! Optional paging for collection reads
//!
//! Collection reads are unbounded unless the caller asks for a page.

use serde::Serialize;

/// Rows per page
pub const PAGE_SIZE: i64 = 100;

/// Paging metadata returned alongside a page of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed, clamped into range)
    pub page: i64,
    pub page_size: i64,
    pub total_rows: i64,
    pub total_pages: i64,
    /// Row offset for LIMIT/OFFSET
    #[serde(skip)]
    pub offset: i64,
}

impl Pagination {
    /// Clamp `requested_page` into `[1, total_pages]` and compute the offset
    ///
    /// # Examples
    /// ```
    /// use mmtl_common::pagination::Pagination;
    ///
    /// let p = Pagination::new(250, 99);
    /// assert_eq!(p.page, 3);
    /// assert_eq!(p.offset, 200);
    /// ```
    pub fn new(total_rows: i64, requested_page: i64) -> Self {
        let total_rows = total_rows.max(0);
        let total_pages = (total_rows + PAGE_SIZE - 1) / PAGE_SIZE;
        let page = requested_page.clamp(1, total_pages.max(1));

        Self {
            page,
            page_size: PAGE_SIZE,
            total_rows,
            total_pages,
            offset: (page - 1) * PAGE_SIZE,
        }
    }
}
