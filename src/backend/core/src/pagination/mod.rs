//! Offset pagination for the job listing.
//!
//! The dashboard addresses pages by 1-indexed page number and page size.
//! A page number of 0 or a page size of 0 selects nothing; the total count
//! is still reported.

mod offset;
mod response;

pub use offset::{PageRequest, SortDirection};
pub use response::Page;

/// Largest page size accepted from a client.
pub const MAX_PAGE_SIZE: u64 = 500;
