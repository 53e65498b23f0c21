use async_trait::async_trait;
use reqwest::Method;

use crate::api::client::ApiClient;
use crate::api::transport::AuditTransport;
use crate::api::types::{
    ActionTypeOption, ActionTypesResponse, ApiError, AuditAction, AuditExportResponse,
    AuditListResponse, AuditStats, AuditWriteRequest,
};
use crate::audit::query::AuditFilters;

impl ApiClient {
    pub async fn list_audit_actions(
        &self,
        filters: &AuditFilters,
    ) -> Result<AuditListResponse, ApiError> {
        let params = filters.query_pairs();
        let mut request = self.request(Method::GET, "/audit").await?;
        if !params.is_empty() {
            request = request.query(&params);
        }
        self.fetch_json(request).await
    }

    pub async fn audit_stats(&self, client_id: Option<&str>) -> Result<AuditStats, ApiError> {
        let mut request = self.request(Method::GET, "/audit/stats").await?;
        if let Some(id) = client_id.map(str::trim).filter(|id| !id.is_empty()) {
            request = request.query(&[("clientId", id)]);
        }
        self.fetch_json(request).await
    }

    pub async fn audit_action_types(&self) -> Result<Vec<ActionTypeOption>, ApiError> {
        let request = self.request(Method::GET, "/audit/actions").await?;
        let body: ActionTypesResponse = self.fetch_json(request).await?;
        Ok(body.actions)
    }

    pub async fn export_audit_actions(
        &self,
        filters: &AuditFilters,
    ) -> Result<AuditExportResponse, ApiError> {
        let params = filters.export_query_pairs();
        let mut request = self.request(Method::GET, "/audit/export").await?;
        if !params.is_empty() {
            request = request.query(&params);
        }
        self.fetch_json(request).await
    }

    pub async fn write_audit_action(
        &self,
        payload: &AuditWriteRequest,
    ) -> Result<AuditAction, ApiError> {
        let request = self.request(Method::POST, "/audit").await?.json(payload);
        self.fetch_json(request).await
    }
}

#[async_trait(?Send)]
impl AuditTransport for ApiClient {
    async fn list_audit_actions(&self, filters: &AuditFilters) -> Result<AuditListResponse, ApiError> {
        ApiClient::list_audit_actions(self, filters).await
    }

    async fn audit_stats(&self, client_id: Option<&str>) -> Result<AuditStats, ApiError> {
        ApiClient::audit_stats(self, client_id).await
    }

    async fn audit_action_types(&self) -> Result<Vec<ActionTypeOption>, ApiError> {
        ApiClient::audit_action_types(self).await
    }

    async fn export_audit_actions(
        &self,
        filters: &AuditFilters,
    ) -> Result<AuditExportResponse, ApiError> {
        ApiClient::export_audit_actions(self, filters).await
    }

    async fn write_audit_action(&self, request: &AuditWriteRequest) -> Result<AuditAction, ApiError> {
        ApiClient::write_audit_action(self, request).await
    }
}
