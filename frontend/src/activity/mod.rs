mod mirror;

pub use mirror::{
    ActivityEvent, ActivityKind, ActivityMirror, ActivitySummary, NewActivity,
    SubscriptionId,
    DEFAULT_ACTIVITY_CAPACITY,
};
