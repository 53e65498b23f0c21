mod audit_log;
pub mod client;
mod notifications;
pub mod transport;
pub mod types;

pub use client::*;
pub use transport::{AuditTransport, NotificationTransport};
pub use types::*;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod test_support;
