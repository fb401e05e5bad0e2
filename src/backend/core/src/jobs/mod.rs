//! Job data model: stored rows, their flow-service key, and enriched rows.

mod paired;
mod record;

pub use paired::{Enrichment, PairedResult};
pub use record::{JobKey, JobRecord, UNFINISHED_STATUSES};

/// One page of the enriched job listing.
pub type JobPage = crate::pagination::Page<PairedResult>;
