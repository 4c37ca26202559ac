//! Paged listing types shared by ports and services.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One-based page request. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn normalized(self) -> Self {
        Self::new(self.page, self.limit)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let limit = u64::from(request.limit.max(1));
        Self {
            items,
            total,
            page: request.page,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_requests() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req, PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(3, 1_000).limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn offset_and_total_pages() {
        let req = PageRequest::new(3, 10);
        assert_eq!(req.offset(), 20);
        let page: Page<u8> = Page::new(vec![], 21, req);
        assert_eq!(page.total_pages, 3);
        let empty: Page<u8> = Page::new(vec![], 0, req);
        assert_eq!(empty.total_pages, 0);
    }
}
