use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::api::client::{path_segment, ApiClient};
use crate::api::transport::NotificationTransport;
use crate::api::types::{
    ApiError, CreateNotificationRequest, Notification, NotificationListResponse,
    UpdateNotificationRequest,
};
use crate::notifications::filters::NotificationFilters;

/// The unread-count endpoint answers with a bare integer; older servers wrap it.
#[derive(Deserialize)]
#[serde(untagged)]
enum UnreadCountBody {
    Bare(u64),
    Wrapped { count: u64 },
}

impl ApiClient {
    pub async fn list_notifications(
        &self,
        filters: &NotificationFilters,
        limit: u64,
        offset: u64,
    ) -> Result<NotificationListResponse, ApiError> {
        let params = filters.query_pairs(limit, offset);
        let request = self
            .request(Method::GET, "/notifications")
            .await?
            .query(&params);
        self.fetch_json(request).await
    }

    pub async fn unread_notification_count(&self) -> Result<u64, ApiError> {
        let request = self
            .request(Method::GET, "/notifications/unread-count")
            .await?;
        let body: UnreadCountBody = self.fetch_json(request).await?;
        Ok(match body {
            UnreadCountBody::Bare(count) | UnreadCountBody::Wrapped { count } => count,
        })
    }

    pub async fn create_notification(
        &self,
        payload: &CreateNotificationRequest,
    ) -> Result<Notification, ApiError> {
        if payload.title.trim().is_empty() || payload.message.trim().is_empty() {
            return Err(ApiError::validation("Notification title and message are required"));
        }
        let request = self
            .request(Method::POST, "/notifications")
            .await?
            .json(payload);
        self.fetch_json(request).await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<Notification, ApiError> {
        let path = format!("/notifications/{}/read", path_segment(id));
        let request = self.request(Method::PATCH, &path).await?;
        self.fetch_json(request).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        let request = self
            .request(Method::PATCH, "/notifications/read-all")
            .await?;
        self.send(request).await.map(|_| ())
    }

    pub async fn update_notification(
        &self,
        id: &str,
        payload: &UpdateNotificationRequest,
    ) -> Result<Notification, ApiError> {
        if payload.is_read == Some(false) {
            return Err(ApiError::validation(
                "Notifications cannot be marked unread from the client",
            ));
        }
        let path = format!("/notifications/{}", path_segment(id));
        let request = self.request(Method::PATCH, &path).await?.json(payload);
        self.fetch_json(request).await
    }

    pub async fn delete_notification(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/notifications/{}", path_segment(id));
        let request = self.request(Method::DELETE, &path).await?;
        self.send(request).await.map(|_| ())
    }

    pub async fn delete_all_notifications(&self) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, "/notifications").await?;
        self.send(request).await.map(|_| ())
    }
}

#[async_trait(?Send)]
impl NotificationTransport for ApiClient {
    async fn list_notifications(
        &self,
        filters: &NotificationFilters,
        limit: u64,
        offset: u64,
    ) -> Result<NotificationListResponse, ApiError> {
        ApiClient::list_notifications(self, filters, limit, offset).await
    }

    async fn unread_notification_count(&self) -> Result<u64, ApiError> {
        ApiClient::unread_notification_count(self).await
    }

    async fn create_notification(
        &self,
        request: &CreateNotificationRequest,
    ) -> Result<Notification, ApiError> {
        ApiClient::create_notification(self, request).await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<Notification, ApiError> {
        ApiClient::mark_notification_read(self, id).await
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        ApiClient::mark_all_notifications_read(self).await
    }

    async fn update_notification(
        &self,
        id: &str,
        request: &UpdateNotificationRequest,
    ) -> Result<Notification, ApiError> {
        ApiClient::update_notification(self, id, request).await
    }

    async fn delete_notification(&self, id: &str) -> Result<(), ApiError> {
        ApiClient::delete_notification(self, id).await
    }

    async fn delete_all_notifications(&self) -> Result<(), ApiError> {
        ApiClient::delete_all_notifications(self).await
    }
}
