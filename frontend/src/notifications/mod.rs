pub mod engine;
pub mod filters;
pub mod inbox;
pub mod scheduler;

pub use engine::{
    FetchOutcome, NotificationSyncEngine, SyncError, SyncPhase, DEFAULT_NOTIFICATION_PAGE_SIZE,
    DEFAULT_NOTIFICATION_REFRESH_SECS,
};
pub use filters::{NotificationFilterUpdate, NotificationFilters};
pub use inbox::NotificationInboxState;
pub use scheduler::AutoRefreshHandle;
