use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 15;
pub const MAX_LIMIT: u32 = 100;

/// 1-indexed page request as sent in `?page=&limit=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }.normalized()
    }

    /// Clamp page to >= 1 and limit to 1..=MAX_LIMIT
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit as i64
    }

    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

/// Raw slice returned by the store: one page of rows plus the unpaged total
#[derive(Debug, Clone)]
pub struct QueryPage<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

/// Paginated response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u32,
    /// 1-based position of the first doc on this page
    pub paging_counter: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn from_query(result: QueryPage<T>, request: PageRequest) -> Self {
        let request = request.normalized();
        let total_pages = if result.total == 0 {
            1
        } else {
            result.total.div_ceil(request.limit as u64) as u32
        };
        let has_prev_page = request.page > 1;
        let has_next_page = request.page < total_pages;

        Self {
            docs: result.rows,
            total_docs: result.total,
            limit: request.limit,
            page: request.page,
            total_pages,
            paging_counter: request.offset() as u64 + 1,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| request.page - 1),
            next_page: has_next_page.then(|| request.page + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let request: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, PageRequest::default());
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 15);

        let clamped = PageRequest::new(0, 10_000);
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.limit, MAX_LIMIT);
        assert_eq!(PageRequest::new(3, 15).offset(), 30);
    }

    #[test]
    fn test_empty_page_metadata() {
        let page: Page<u8> = Page::from_query(QueryPage { rows: vec![], total: 0 }, PageRequest::default());
        assert!(page.docs.is_empty());
        assert_eq!(page.total_docs, 0);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
        assert!(!page.has_prev_page);
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_middle_page_metadata() {
        let page = Page::from_query(QueryPage { rows: vec![1, 2], total: 32 }, PageRequest::new(2, 15));
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.paging_counter, 16);
        assert_eq!(page.prev_page, Some(1));
        assert_eq!(page.next_page, Some(3));
    }
}
