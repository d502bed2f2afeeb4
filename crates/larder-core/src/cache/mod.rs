//! Query cache: per-key entries with staleness tracking, request
//! de-duplication, and stale-while-revalidate semantics.

mod entry;
mod registry;

pub use entry::{EntrySnapshot, ErrorInfo, QueryStatus};
pub use registry::{QueryRegistry, RetainGuard};
