// larder-core: client-side list-state synchronization for the Larder
// admin dashboard. Server data is cached per query key, revalidated on
// staleness, and invalidated by the single mutation path.

pub mod cache;
pub mod error;
pub mod freshness;
pub mod key;
pub mod list;
pub mod mutation;
pub mod session;

pub use cache::{EntrySnapshot, ErrorInfo, QueryRegistry, QueryStatus, RetainGuard};
pub use error::SyncError;
pub use freshness::FreshnessPolicy;
pub use key::{ParamValue, ResourceKey, ResourceKind};
pub use list::{ListController, ListFetcher, ViewState};
pub use mutation::{MutationCoordinator, MutationIntent, MutationKind};
pub use session::Session;
