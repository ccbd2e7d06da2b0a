//! Offset/limit computation for the page slicer.

use super::Pageable;
use crate::repo::{RepoError, RepoResult};

/// Row window for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

impl Window {
    /// Computes `offset = (page - 1) * page_size` and `limit = page_size`.
    ///
    /// # Errors
    /// - `InvalidPagination` when `page < 1` or `page_size < 1`. Values are
    ///   never clamped.
    pub fn for_page(pageable: Pageable) -> RepoResult<Self> {
        if pageable.page < 1 || pageable.page_size < 1 {
            return Err(RepoError::InvalidPagination {
                page: pageable.page,
                page_size: pageable.page_size,
            });
        }

        let page_size = u64::from(pageable.page_size);
        Ok(Self {
            limit: page_size,
            offset: (u64::from(pageable.page) - 1) * page_size,
        })
    }
}
