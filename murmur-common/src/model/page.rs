use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-based page number and a page size.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPageRequestError {
    #[error("Pages are numbered from 1")]
    ZeroPage,
    #[error("The page limit must be between 1 and {MAX_PAGE_LIMIT}, got {0}")]
    LimitOutOfRange(u32),
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, InvalidPageRequestError> {
        if page == 0 {
            return Err(InvalidPageRequestError::ZeroPage);
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(InvalidPageRequestError::LimitOutOfRange(limit));
        }

        Ok(Self { page, limit })
    }

    /// Fills in [`DEFAULT_PAGE`] and [`DEFAULT_PAGE_LIMIT`] for missing values.
    pub fn from_optional(
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Self, InvalidPageRequestError> {
        Self::new(
            page.unwrap_or(DEFAULT_PAGE),
            limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
    }

    #[must_use]
    pub fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn limit(self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use crate::model::page::{InvalidPageRequestError, MAX_PAGE_LIMIT, PageRequest};

    #[test]
    fn offsets_are_zero_based() {
        assert_eq!(PageRequest::new(1, 10).unwrap().offset(), 0);
        assert_eq!(PageRequest::new(3, 25).unwrap().offset(), 50);
        assert_eq!(PageRequest::default(), PageRequest::from_optional(None, None).unwrap());
    }

    #[test]
    fn rejects_out_of_range_requests() {
        assert_eq!(
            PageRequest::new(0, 10),
            Err(InvalidPageRequestError::ZeroPage)
        );
        assert_eq!(
            PageRequest::new(1, 0),
            Err(InvalidPageRequestError::LimitOutOfRange(0))
        );
        assert!(PageRequest::new(1, MAX_PAGE_LIMIT).is_ok());
        assert!(PageRequest::new(1, MAX_PAGE_LIMIT + 1).is_err());
    }
}
