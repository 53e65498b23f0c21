use std::rc::Rc;

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::api::transport::AuditTransport;
use crate::api::types::{
    ActionTypeOption, ApiError, AuditAction, AuditStats, AuditWriteRequest,
};
use crate::audit::export::AuditExport;
use crate::audit::taxonomy::AuditActionType;

pub const MAX_AUDIT_PAGE_SIZE: u64 = 200;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Rejected locally, no request was sent.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to render export: {0}")]
    Export(String),
}

/// Audit list filters. Every field is optional; unset or blank ones are left
/// out of the query string entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub action_type: Option<String>,
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl AuditFilters {
    pub fn page(page: u64, limit: u64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_action(mut self, action: AuditActionType) -> Self {
        self.action_type = Some(action.as_tag().to_string());
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page == Some(0) {
            return Err(QueryError::Validation("page is 1-indexed".into()));
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_AUDIT_PAGE_SIZE {
                return Err(QueryError::Validation(format!(
                    "limit must be between 1 and {}",
                    MAX_AUDIT_PAGE_SIZE
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(QueryError::Validation(
                    "start date must not be after end date".into(),
                ));
            }
        }
        Ok(())
    }

    /// Filter parameters shared by the list and export endpoints.
    pub fn export_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(d) = self.start_date {
            params.push(("startDate", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.end_date {
            params.push(("endDate", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(v) = non_blank(&self.action_type) {
            params.push(("actionType", v));
        }
        if let Some(v) = non_blank(&self.user_id) {
            params.push(("userId", v));
        }
        if let Some(v) = non_blank(&self.client_id) {
            params.push(("clientId", v));
        }
        if let Some(v) = non_blank(&self.search) {
            params.push(("search", v));
        }
        params
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = self.export_query_pairs();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditPage {
    pub items: Vec<AuditAction>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub page_count: u64,
}

impl AuditPage {
    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        total.div_ceil(limit)
    }
}

/// Read access to the authoritative audit log, plus the raw write primitive
/// the emitter goes through.
#[derive(Clone)]
pub struct AuditQueryService {
    transport: Rc<dyn AuditTransport>,
    default_page_size: u64,
}

impl AuditQueryService {
    pub fn new(transport: Rc<dyn AuditTransport>, default_page_size: u64) -> Self {
        Self {
            transport,
            default_page_size: default_page_size.clamp(1, MAX_AUDIT_PAGE_SIZE),
        }
    }

    /// Fetches one page. Without an explicit `limit` the configured page
    /// size is sent.
    pub async fn query(&self, filters: &AuditFilters) -> Result<AuditPage, QueryError> {
        let filters = AuditFilters {
            limit: filters.limit.or(Some(self.default_page_size)),
            ..filters.clone()
        };
        filters.validate()?;
        let response = self.transport.list_audit_actions(&filters).await?;

        let page = filters.page.unwrap_or(response.page.max(1));
        let limit = match response.limit {
            0 => filters.limit.unwrap_or(self.default_page_size),
            limit => limit,
        };
        let page_count = page_count(response.total, limit);
        let items = if page > page_count {
            Vec::new()
        } else {
            response.data
        };
        log::debug!(
            "audit page {}/{} ({} of {} actions)",
            page,
            page_count,
            items.len(),
            response.total
        );

        Ok(AuditPage {
            items,
            total: response.total,
            page,
            limit,
            page_count,
        })
    }

    pub async fn stats(&self, client_id: Option<&str>) -> Result<AuditStats, QueryError> {
        let mut stats = self.transport.audit_stats(client_id).await?;
        stats.top_actions.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(stats)
    }

    pub async fn action_types(&self) -> Result<Vec<ActionTypeOption>, QueryError> {
        Ok(self.transport.audit_action_types().await?)
    }

    pub async fn export(&self, filters: &AuditFilters) -> Result<AuditExport, QueryError> {
        filters.validate()?;
        let response = self.transport.export_audit_actions(filters).await?;
        Ok(AuditExport::new(response.data, response.filename))
    }

    pub async fn write(
        &self,
        action: AuditActionType,
        description: &str,
        metadata: Option<Value>,
    ) -> Result<AuditAction, QueryError> {
        if description.trim().is_empty() {
            return Err(QueryError::Validation(
                "audit description must not be empty".into(),
            ));
        }
        let request = AuditWriteRequest {
            action,
            description: description.to_string(),
            target_user_id: None,
            metadata,
        };
        Ok(self.transport.write_audit_action(&request).await?)
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::api::test_support::fakes::{audit_action, FakeAuditTransport};
    use crate::api::types::ActionCount;

    fn service(transport: &Rc<FakeAuditTransport>) -> AuditQueryService {
        AuditQueryService::new(transport.clone(), 20)
    }

    fn seeded(count: usize) -> Rc<FakeAuditTransport> {
        let transport = Rc::new(FakeAuditTransport::default());
        for i in 0..count {
            let action = if i % 3 == 0 {
                AuditActionType::Vente
            } else {
                AuditActionType::ScanProduit
            };
            transport.seed(audit_action(&format!("a{}", i), action));
        }
        transport
    }

    #[test]
    fn unset_and_blank_filters_are_omitted() {
        let filters = AuditFilters {
            action_type: Some("  ".into()),
            user_id: Some("u-7".into()),
            search: None,
            ..AuditFilters::default()
        };
        assert_eq!(filters.query_pairs(), vec![("userId", "u-7".to_string())]);
        assert!(AuditFilters::default().query_pairs().is_empty());
    }

    #[test]
    fn dates_are_sent_as_plain_dates() {
        let filters = AuditFilters {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 31),
            ..AuditFilters::page(2, 50)
        };
        let pairs = filters.query_pairs();
        assert!(pairs.contains(&("startDate", "2026-03-01".to_string())));
        assert!(pairs.contains(&("endDate", "2026-03-31".to_string())));
        assert!(pairs.contains(&("page", "2".to_string())));
        assert!(filters.export_query_pairs().iter().all(|(k, _)| *k != "page"));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(45, 20), 3);
        assert_eq!(page_count(40, 20), 2);
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(5, 0), 0);
    }

    #[tokio::test]
    async fn invalid_filters_never_reach_the_transport() {
        let transport = seeded(3);
        let svc = service(&transport);

        let err = svc.query(&AuditFilters::page(0, 20)).await.unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));

        let reversed = AuditFilters {
            start_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..AuditFilters::default()
        };
        assert!(matches!(
            svc.export(&reversed).await,
            Err(QueryError::Validation(_))
        ));
        assert_eq!(transport.list_calls(), 0);
    }

    #[tokio::test]
    async fn query_reports_page_count_and_filters_by_action() {
        let transport = seeded(45);
        let svc = service(&transport);

        let page = svc.query(&AuditFilters::page(1, 20)).await.unwrap();
        assert_eq!(page.items.len(), 20);
        assert_eq!(page.total, 45);
        assert_eq!(page.page_count, 3);
        assert!(page.has_next());

        let sales = svc
            .query(&AuditFilters::page(1, 20).with_action(AuditActionType::Vente))
            .await
            .unwrap();
        assert_eq!(sales.total, 15);
        assert!(sales
            .items
            .iter()
            .all(|a| a.action == AuditActionType::Vente));
    }

    #[tokio::test]
    async fn configured_page_size_is_sent_when_no_limit_is_set() {
        let transport = seeded(12);
        let svc = AuditQueryService::new(transport.clone(), 5);

        let page = svc.query(&AuditFilters::default()).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.limit, 5);
        assert_eq!(page.page_count, 3);
        assert_eq!(transport.last_filters().and_then(|f| f.limit), Some(5));

        let explicit = svc.query(&AuditFilters::page(1, 10)).await.unwrap();
        assert_eq!(explicit.items.len(), 10);
    }

    #[tokio::test]
    async fn page_beyond_page_count_is_empty_not_an_error() {
        let transport = seeded(45);
        let svc = service(&transport);

        let page = svc.query(&AuditFilters::page(9, 20)).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 45);
        assert_eq!(page.page_count, 3);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_server_message() {
        let transport = seeded(1);
        transport.fail_reads(ApiError::unknown("Base indisponible"));
        let err = service(&transport)
            .query(&AuditFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Base indisponible");
    }

    #[tokio::test]
    async fn stats_order_top_actions_by_count() {
        let transport = seeded(0);
        transport.set_stats(AuditStats {
            total_actions: 10,
            today_actions: 4,
            top_actions: vec![
                ActionCount { action: "SCAN_PRODUIT".into(), count: 2 },
                ActionCount { action: "VENTE".into(), count: 7 },
            ],
            user_stats: Vec::new(),
        });
        let stats = service(&transport).stats(None).await.unwrap();
        assert_eq!(stats.top_actions[0].action, "VENTE");
        assert_eq!(stats.today_actions, 4);
    }

    #[tokio::test]
    async fn write_rejects_blank_description() {
        let transport = seeded(0);
        let err = service(&transport)
            .write(AuditActionType::Vente, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
        assert!(transport.writes().is_empty());
    }

    #[tokio::test]
    async fn export_carries_rows_and_server_filename() {
        let transport = seeded(4);
        let export = service(&transport)
            .export(&AuditFilters::default())
            .await
            .unwrap();
        assert_eq!(export.rows.len(), 4);
        assert_eq!(export.suggested_filename, "audit-export.csv");
    }
}
