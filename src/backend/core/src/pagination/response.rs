//! Page envelope returned to the dashboard.

use serde::{Deserialize, Serialize};

use super::offset::PageRequest;

/// One page of results with its pagination metadata.
///
/// `total_record` comes from an independent count and may exceed the
/// number of items on any one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub list: Vec<T>,
    pub page_num: u64,
    pub page_size: u64,
    pub total_record: u64,
    pub total_page: u64,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, list: Vec<T>, total_record: u64) -> Self {
        Self {
            list,
            page_num: request.page_num,
            page_size: request.page_size,
            total_record,
            total_page: request.total_pages(total_record),
        }
    }

    pub fn empty(request: PageRequest, total_record: u64) -> Self {
        Self::new(request, Vec::new(), total_record)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
