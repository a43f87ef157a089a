//! Page-number pagination shared by every feed.

use serde::Serialize;

/// Posts per feed page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Parse a `?page=` value; anything missing, malformed or below one means page 1.
pub fn parse_page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|number| *number >= 1)
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub num_pages: u32,
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Assemble a page; an empty result set still reports a single page.
    pub fn new(items: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        let size = u64::from(request.size);
        let pages = total_count.div_ceil(size).max(1);
        let num_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        Self {
            items,
            number: request.number,
            size: request.size,
            num_pages,
            total_count,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> Option<u32> {
        self.has_previous().then(|| (self.number - 1).min(self.num_pages))
    }

    pub fn next_number(&self) -> Option<u32> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn page_numbers(&self) -> impl Iterator<Item = u32> {
        1..=self.num_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            num_pages: self.num_pages,
            total_count: self.total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_falls_back_to_first() {
        assert_eq!(parse_page_number(None), 1);
        assert_eq!(parse_page_number(Some("abc")), 1);
        assert_eq!(parse_page_number(Some("0")), 1);
        assert_eq!(parse_page_number(Some("-3")), 1);
        assert_eq!(parse_page_number(Some("2")), 2);
    }

    #[test]
    fn thirteen_items_make_two_pages() {
        let first = Page::new(vec![0; 10], PageRequest::new(1, 10), 13);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next());
        assert!(!first.has_previous());
        assert_eq!(first.next_number(), Some(2));

        let second = Page::new(vec![0; 3], PageRequest::new(2, 10), 13);
        assert!(!second.has_next());
        assert_eq!(second.previous_number(), Some(1));
        assert_eq!(PageRequest::new(2, 10).offset(), 10);
    }

    #[test]
    fn empty_scope_is_one_empty_page() {
        let page: Page<u8> = Page::new(Vec::new(), PageRequest::new(1, 10), 0);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next());
    }

    #[test]
    fn page_past_the_end_points_back_to_last() {
        let page: Page<u8> = Page::new(Vec::new(), PageRequest::new(5, 10), 13);
        assert!(page.items.is_empty());
        assert!(!page.has_next());
        assert_eq!(page.previous_number(), Some(2));
    }
}
