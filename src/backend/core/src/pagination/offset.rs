//! Page number / page size handling and SQL OFFSET/LIMIT computation.

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, ErrorCode};

// ═══════════════════════════════════════════════════════════════════════════════
// Sort Direction
// ═══════════════════════════════════════════════════════════════════════════════

/// Sort direction for ordered page queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (oldest first).
    Asc,
    /// Descending order (newest first).
    #[default]
    Desc,
}

impl SortDirection {
    /// Get the SQL keyword for this direction.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse `asc` / `desc`, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, BoardError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(BoardError::invalid_format("orderType", other)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Page Request
// ═══════════════════════════════════════════════════════════════════════════════

/// A requested page: 1-indexed page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page_num: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page_num: u64, page_size: u64) -> Self {
        Self { page_num, page_size }
    }

    /// Whether this request can only ever yield an empty page.
    pub fn selects_nothing(&self) -> bool {
        self.page_num == 0 || self.page_size == 0
    }

    /// Index of the first row of this page (SQL OFFSET).
    pub fn start_index(&self) -> u64 {
        self.page_num.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// SQL LIMIT value.
    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// Number of pages needed to show `total_record` rows.
    pub fn total_pages(&self, total_record: u64) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            total_record.div_ceil(self.page_size)
        }
    }

    /// Reject page sizes the service will not fan out for.
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.page_size > super::MAX_PAGE_SIZE {
            return Err(BoardError::new(
                ErrorCode::InvalidInput,
                format!("Page size cannot exceed {}", super::MAX_PAGE_SIZE),
            ));
        }
        Ok(())
    }
}
