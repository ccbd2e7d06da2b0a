//! Page request and page result types.
//!
//! # Responsibility
//! - Model `page`/`pageSize` windowing and multi-field sort requests.
//! - Compute row windows and package results into immutable pages.

mod page;
mod request;
mod window;

pub use page::Page;
pub use request::{
    Pageable, SortDirection, SortSpec, Sortable, SortablePageRequest, DEFAULT_PAGE_SIZE,
};
pub use window::Window;
