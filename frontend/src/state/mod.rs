pub mod activity;
pub mod notifications;
