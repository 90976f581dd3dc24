//! Search pagination with server-enforced limits

use serde::{Deserialize, Serialize};

/// Results per page when the caller asks for none
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Upper bound applied regardless of the requested size
pub const MAX_PAGE_SIZE: u32 = 50;

/// Zero-based page of search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, requested_size: u32) -> Self {
        Self {
            page_number,
            page_size: requested_size,
        }
    }

    /// Effective page size (0 means default, clamped to the maximum)
    pub fn page_size(&self) -> u32 {
        match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        }
    }

    /// Number of results to skip
    pub fn offset(&self) -> usize {
        (self.page_number as usize).saturating_mul(self.page_size() as usize)
    }

    pub fn next(&self) -> Self {
        Self {
            page_number: self.page_number.saturating_add(1),
            page_size: self.page_size(),
        }
    }
}
