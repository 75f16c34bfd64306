//! Offset pagination shared by edition and post listings.

use serde::Serialize;

use super::media::InvalidInput;

/// A validated page request. Pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    offset: i64,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, InvalidInput> {
        if page == 0 {
            return Err(InvalidInput::BelowOne("page"));
        }
        if page_size == 0 {
            return Err(InvalidInput::BelowOne("limit"));
        }
        let offset = i64::from(page - 1)
            .checked_mul(i64::from(page_size))
            .ok_or(InvalidInput::PageOutOfRange {
                page,
                limit: page_size,
            })?;
        Ok(Self {
            page,
            page_size,
            offset,
        })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// One page of results plus the totals needed to walk the rest.
#[derive(Serialize, Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            pages: total.div_ceil(u64::from(request.page_size)),
        }
    }
}
