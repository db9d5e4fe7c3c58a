use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 10;

/// `?page=&per_page=` query parameters
///
/// Signed so that out-of-range numbers are clamped rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// A validated 1-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Floors `page` at 1 and clamps `per_page` into `1..=max_per_page`
    pub fn new(page: Option<i64>, per_page: Option<i64>, max_per_page: u32) -> Self {
        let max_per_page = i64::from(max_per_page.max(1));
        Self {
            page: page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32,
            per_page: per_page
                .unwrap_or(i64::from(DEFAULT_PER_PAGE))
                .clamp(1, max_per_page) as u32,
        }
    }

    pub fn from_params(params: &PageParams, max_per_page: u32) -> Self {
        Self::new(params.page, params.per_page, max_per_page)
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// One page of a listing plus the size of the full filtered set
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    /// Cuts the requested window out of an already ordered listing
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.per_page as usize)
            .collect();
        Self { items, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// The `{items, _meta, _links}` envelope of every collection response
#[derive(Debug, Serialize)]
pub struct Collection<T> {
    pub items: Vec<T>,
    #[serde(rename = "_meta")]
    pub meta: CollectionMeta,
    #[serde(rename = "_links")]
    pub links: CollectionLinks,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CollectionMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CollectionLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

impl<T> Collection<T> {
    /// Builds the envelope for `page`, linking back to `endpoint`.
    ///
    /// `extra` query parameters (e.g. the search string) are repeated in
    /// every link.
    pub fn build(page: Page<T>, request: PageRequest, endpoint: &str, extra: &[(&str, &str)]) -> Self {
        let total_pages = page.total.div_ceil(request.per_page as u64);
        let current = request.page as u64;

        let link = |p: u32| page_link(endpoint, p, request.per_page, extra);

        Self {
            items: page.items,
            meta: CollectionMeta {
                page: request.page,
                per_page: request.per_page,
                total_pages,
                total_items: page.total,
            },
            links: CollectionLinks {
                self_link: link(request.page),
                next: (current < total_pages).then(|| link(request.page + 1)),
                prev: (request.page > 1).then(|| link(request.page - 1)),
            },
        }
    }
}

fn page_link(endpoint: &str, page: u32, per_page: u32, extra: &[(&str, &str)]) -> String {
    let mut link = format!("{}?page={}&per_page={}", endpoint, page, per_page);
    for (key, value) in extra {
        link.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamping() {
        assert_eq!(
            PageRequest::new(None, None, 100),
            PageRequest { page: 1, per_page: 10 }
        );
        assert_eq!(
            PageRequest::new(Some(0), Some(500), 100),
            PageRequest { page: 1, per_page: 100 }
        );
        assert_eq!(PageRequest::new(Some(3), Some(0), 100).per_page, 1);
    }

    #[test]
    fn test_negative_values_are_clamped() {
        assert_eq!(
            PageRequest::new(Some(-1), Some(-5), 100),
            PageRequest { page: 1, per_page: 1 }
        );
    }

    #[test]
    fn test_offset() {
        let request = PageRequest::new(Some(3), Some(20), 100);
        assert_eq!(request.offset(), 40);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn test_slice_out_of_range_is_empty() {
        let page = Page::slice(vec![1, 2, 3], PageRequest::new(Some(5), Some(2), 100));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_second_page_of_single_item() {
        let request = PageRequest::new(Some(2), Some(10), 100);
        let page = Page::slice(vec!["only"], request);
        let collection = Collection::build(page, request, "/api/movie/toppop", &[]);

        assert!(collection.items.is_empty());
        assert_eq!(collection.meta.total_items, 1);
        assert_eq!(collection.meta.total_pages, 1);
        assert_eq!(collection.links.next, None);
        assert_eq!(
            collection.links.prev.as_deref(),
            Some("/api/movie/toppop?page=1&per_page=10")
        );
    }

    #[test]
    fn test_middle_page_links() {
        let request = PageRequest::new(Some(2), Some(10), 100);
        let page = Page::slice((0..25).collect::<Vec<_>>(), request);
        let collection = Collection::build(page, request, "/api/movie/toppop", &[]);

        assert_eq!(collection.items, (10..20).collect::<Vec<_>>());
        assert_eq!(collection.meta.total_pages, 3);
        assert_eq!(
            collection.links.self_link,
            "/api/movie/toppop?page=2&per_page=10"
        );
        assert_eq!(
            collection.links.next.as_deref(),
            Some("/api/movie/toppop?page=3&per_page=10")
        );
    }

    #[test]
    fn test_extra_params_are_encoded() {
        let request = PageRequest::new(None, None, 100);
        let collection = Collection::build(
            Page::<u8>::empty(),
            request,
            "/api/movie/searchByKeywords",
            &[("q", "pulp fiction")],
        );
        assert_eq!(
            collection.links.self_link,
            "/api/movie/searchByKeywords?page=1&per_page=10&q=pulp%20fiction"
        );
        assert_eq!(collection.meta.total_pages, 0);
        assert_eq!(collection.links.prev, None);
    }
}
