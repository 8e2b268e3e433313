use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Pagination parameters as supplied by the caller. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
}

fn first_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: first_page(),
            size: default_page_size(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Validate against the configured maximum.
    ///
    /// Page and size below 1 are rejected; a size above `max_page_size` is
    /// clamped rather than rejected.
    pub fn window(&self, max_page_size: u64) -> Result<PageWindow, DataError> {
        if self.page < 1 {
            return Err(DataError::invalid(format!(
                "page must be at least 1, got {}",
                self.page
            )));
        }
        if self.size < 1 {
            return Err(DataError::invalid(format!(
                "page size must be at least 1, got {}",
                self.size
            )));
        }
        Ok(PageWindow {
            page: self.page,
            size: self.size.min(max_page_size.max(1)),
        })
    }
}

/// A validated, clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: u64,
    size: u64,
}

impl PageWindow {
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

/// A page of results with pagination metadata.
///
/// `total_count` counts the filtered set before pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: &PageWindow, total_count: u64) -> Self {
        Self {
            items,
            page: window.page,
            size: window.size,
            total_count,
            total_pages: total_count.div_ceil(window.size),
        }
    }

    /// Convert every item, keeping the metadata. Fails on the first error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(Page {
            items,
            page: self.page,
            size: self.size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        })
    }
}
