use serde::Serialize;

/// Default number of records revealed per page
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Visible prefix of an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window<T> {
    pub visible: Vec<T>,
    pub has_more: bool,
}

/// Incremental "load more" pagination over an ordered list.
///
/// The page count only ever moves forward by one through [`Paginator::advance`]
/// or back to the first page through [`Paginator::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    page_count: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page_count: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Number of items the window currently allows
    pub fn limit(&self) -> usize {
        self.page_count.saturating_mul(self.page_size)
    }

    pub fn advance(&mut self) {
        self.page_count += 1;
    }

    pub fn reset(&mut self) {
        self.page_count = 1;
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.limit() < total
    }

    pub fn window<T: Clone>(&self, ordered: &[T]) -> Window<T> {
        window(ordered, self.page_size, self.page_count)
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// The first `page_count * page_size` items of `ordered`, and whether more remain.
pub fn window<T: Clone>(ordered: &[T], page_size: usize, page_count: usize) -> Window<T> {
    let limit = page_count.saturating_mul(page_size);
    Window {
        visible: ordered.iter().take(limit).cloned().collect(),
        has_more: limit < ordered.len(),
    }
}
