//! Seams between the sync components and the HTTP layer.
//!
//! `ApiClient` implements both traits; tests swap in the in-memory fakes from
//! `api::test_support`. Futures are `?Send` because everything runs on the
//! browser's single event loop.

use async_trait::async_trait;

use crate::api::types::{
    ActionTypeOption, ApiError, AuditAction, AuditExportResponse, AuditListResponse, AuditStats,
    AuditWriteRequest, CreateNotificationRequest, Notification, NotificationListResponse,
    UpdateNotificationRequest,
};
use crate::audit::query::AuditFilters;
use crate::notifications::filters::NotificationFilters;

#[async_trait(?Send)]
pub trait AuditTransport {
    async fn list_audit_actions(&self, filters: &AuditFilters) -> Result<AuditListResponse, ApiError>;

    async fn audit_stats(&self, client_id: Option<&str>) -> Result<AuditStats, ApiError>;

    async fn audit_action_types(&self) -> Result<Vec<ActionTypeOption>, ApiError>;

    async fn export_audit_actions(
        &self,
        filters: &AuditFilters,
    ) -> Result<AuditExportResponse, ApiError>;

    async fn write_audit_action(&self, request: &AuditWriteRequest) -> Result<AuditAction, ApiError>;
}

#[async_trait(?Send)]
pub trait NotificationTransport {
    async fn list_notifications(
        &self,
        filters: &NotificationFilters,
        limit: u64,
        offset: u64,
    ) -> Result<NotificationListResponse, ApiError>;

    async fn unread_notification_count(&self) -> Result<u64, ApiError>;

    async fn create_notification(
        &self,
        request: &CreateNotificationRequest,
    ) -> Result<Notification, ApiError>;

    async fn mark_notification_read(&self, id: &str) -> Result<Notification, ApiError>;

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError>;

    async fn update_notification(
        &self,
        id: &str,
        request: &UpdateNotificationRequest,
    ) -> Result<Notification, ApiError>;

    async fn delete_notification(&self, id: &str) -> Result<(), ApiError>;

    async fn delete_all_notifications(&self) -> Result<(), ApiError>;
}
