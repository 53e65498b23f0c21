/// In-memory stand-ins for the transport traits. They keep just enough
/// server behavior (filtering, paging, counters) for the sync components to
/// be exercised without HTTP.
pub mod fakes {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use futures::channel::oneshot;
    use serde_json::Value;

    use crate::api::transport::{AuditTransport, NotificationTransport};
    use crate::api::types::{
        ActionTypeOption, ApiError, AuditAction, AuditExportResponse, AuditListResponse,
        AuditStats, AuditUser, AuditWriteRequest, CreateNotificationRequest, Notification,
        NotificationListResponse, NotificationType, UpdateNotificationRequest,
    };
    use crate::audit::emitter::{AuditDiagnostic, DiagnosticSink};
    use crate::audit::query::AuditFilters;
    use crate::audit::taxonomy::AuditActionType;
    use crate::notifications::filters::NotificationFilters;

    pub fn audit_action(id: &str, action: AuditActionType) -> AuditAction {
        AuditAction {
            id: id.to_string(),
            user: AuditUser {
                id: "u-1".into(),
                name: "Awa Diallo".into(),
                email: "awa@example.com".into(),
            },
            client: None,
            action,
            description: action.label().to_string(),
            metadata: Value::Null,
            ip_address: Some("10.0.0.4".into()),
            user_agent: None,
            module: Some(action.module().to_string()),
            is_system_action: false,
            created_at: Utc::now(),
        }
    }

    #[derive(Default)]
    struct AuditStore {
        actions: Vec<AuditAction>,
        stats: AuditStats,
        writes: Vec<AuditWriteRequest>,
        read_failure: Option<ApiError>,
        write_failure: Option<ApiError>,
        list_calls: usize,
        last_filters: Option<AuditFilters>,
    }

    #[derive(Default)]
    pub struct FakeAuditTransport {
        store: RefCell<AuditStore>,
    }

    impl FakeAuditTransport {
        pub fn seed(&self, action: AuditAction) {
            self.store.borrow_mut().actions.push(action);
        }

        pub fn set_stats(&self, stats: AuditStats) {
            self.store.borrow_mut().stats = stats;
        }

        /// Every later list, export and stats read fails with `error`.
        pub fn fail_reads(&self, error: ApiError) {
            self.store.borrow_mut().read_failure = Some(error);
        }

        pub fn fail_writes(&self, error: ApiError) {
            self.store.borrow_mut().write_failure = Some(error);
        }

        /// List and export requests received so far.
        pub fn list_calls(&self) -> usize {
            self.store.borrow().list_calls
        }

        pub fn last_filters(&self) -> Option<AuditFilters> {
            self.store.borrow().last_filters.clone()
        }

        pub fn writes(&self) -> Vec<AuditWriteRequest> {
            self.store.borrow().writes.clone()
        }

        fn read(&self, filters: &AuditFilters) -> Result<Vec<AuditAction>, ApiError> {
            let mut store = self.store.borrow_mut();
            store.list_calls += 1;
            store.last_filters = Some(filters.clone());
            if let Some(err) = store.read_failure.clone() {
                return Err(err);
            }
            let search = filters.search.as_deref().map(str::to_lowercase);
            Ok(store
                .actions
                .iter()
                .filter(|a| {
                    filters
                        .action_type
                        .as_deref()
                        .map_or(true, |tag| a.action.as_tag() == tag)
                })
                .filter(|a| filters.user_id.as_deref().map_or(true, |u| a.user.id == u))
                .filter(|a| {
                    search
                        .as_deref()
                        .map_or(true, |s| a.description.to_lowercase().contains(s))
                })
                .cloned()
                .collect())
        }
    }

    #[async_trait(?Send)]
    impl AuditTransport for FakeAuditTransport {
        async fn list_audit_actions(
            &self,
            filters: &AuditFilters,
        ) -> Result<AuditListResponse, ApiError> {
            let matching = self.read(filters)?;
            let page = filters.page.unwrap_or(1);
            let limit = filters.limit.unwrap_or(20);
            let total = matching.len() as u64;
            let data = matching
                .into_iter()
                .skip(((page - 1) * limit) as usize)
                .take(limit as usize)
                .collect();
            Ok(AuditListResponse {
                data,
                total,
                page,
                limit,
                pages: total.div_ceil(limit),
            })
        }

        async fn audit_stats(&self, _client_id: Option<&str>) -> Result<AuditStats, ApiError> {
            let store = self.store.borrow();
            match &store.read_failure {
                Some(err) => Err(err.clone()),
                None => Ok(store.stats.clone()),
            }
        }

        async fn audit_action_types(&self) -> Result<Vec<ActionTypeOption>, ApiError> {
            Ok(AuditActionType::ALL
                .iter()
                .map(|a| ActionTypeOption {
                    key: a.as_tag().to_string(),
                    label: a.label().to_string(),
                })
                .collect())
        }

        async fn export_audit_actions(
            &self,
            filters: &AuditFilters,
        ) -> Result<AuditExportResponse, ApiError> {
            Ok(AuditExportResponse {
                data: self.read(filters)?,
                filename: "audit-export.csv".into(),
            })
        }

        async fn write_audit_action(
            &self,
            request: &AuditWriteRequest,
        ) -> Result<AuditAction, ApiError> {
            let mut store = self.store.borrow_mut();
            store.writes.push(request.clone());
            if let Some(err) = store.write_failure.clone() {
                return Err(err);
            }
            let mut created = audit_action(&format!("srv-{}", store.writes.len()), request.action);
            created.description = request.description.clone();
            created.metadata = request.metadata.clone().unwrap_or(Value::Null);
            store.actions.insert(0, created.clone());
            Ok(created)
        }
    }

    #[derive(Default)]
    pub struct RecordingDiagnostics {
        entries: RefCell<Vec<AuditDiagnostic>>,
    }

    impl RecordingDiagnostics {
        pub fn entries(&self) -> Vec<AuditDiagnostic> {
            self.entries.borrow().clone()
        }
    }

    impl DiagnosticSink for RecordingDiagnostics {
        fn record(&self, diagnostic: &AuditDiagnostic) {
            self.entries.borrow_mut().push(diagnostic.clone());
        }
    }

    pub fn notification_of_kind(id: &str, kind: NotificationType) -> Notification {
        let now = Utc::now();
        Notification {
            id: id.to_string(),
            kind,
            title: format!("Notification {}", id),
            message: "Stock below threshold".into(),
            module: Some("inventory".into()),
            action_url: None,
            metadata: None,
            is_read: false,
            is_global: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn notification(id: &str, is_read: bool) -> Notification {
        Notification {
            is_read,
            ..notification_of_kind(id, NotificationType::Info)
        }
    }

    #[derive(Default)]
    struct NotificationStore {
        // Server order: newest first.
        items: Vec<Notification>,
        list_calls: usize,
        mutation_calls: usize,
        last_window: Option<(u64, u64)>,
        list_failure: Option<ApiError>,
        mutation_failure: Option<ApiError>,
        list_gates: VecDeque<oneshot::Receiver<()>>,
        mutation_gates: VecDeque<oneshot::Receiver<()>>,
    }

    /// Notification server double. Requests can be held open with
    /// `hold_next_*` until the returned sender fires, which is how tests
    /// observe state while a request is in flight.
    #[derive(Default)]
    pub struct FakeNotifications {
        store: RefCell<NotificationStore>,
    }

    impl FakeNotifications {
        /// Adds `count` notifications `n-0..`, newest first; the first `unread`
        /// of them are unread.
        pub fn seed(&self, count: usize, unread: usize) {
            let now = Utc::now();
            let mut store = self.store.borrow_mut();
            for i in 0..count {
                let mut item = notification(&format!("n-{}", i), i >= unread);
                item.created_at = now - Duration::minutes(i as i64);
                item.updated_at = item.created_at;
                store.items.push(item);
            }
        }

        /// Adds a notification on top, as if it just arrived.
        pub fn push(&self, item: Notification) {
            self.store.borrow_mut().items.insert(0, item);
        }

        pub fn hold_next_list(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.store.borrow_mut().list_gates.push_back(rx);
            tx
        }

        pub fn hold_next_mutation(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.store.borrow_mut().mutation_gates.push_back(rx);
            tx
        }

        pub fn fail_next_list(&self, error: ApiError) {
            self.store.borrow_mut().list_failure = Some(error);
        }

        pub fn fail_next_mutation(&self, error: ApiError) {
            self.store.borrow_mut().mutation_failure = Some(error);
        }

        pub fn list_calls(&self) -> usize {
            self.store.borrow().list_calls
        }

        pub fn mutation_calls(&self) -> usize {
            self.store.borrow().mutation_calls
        }

        /// `(limit, offset)` of the latest list request.
        pub fn last_window(&self) -> Option<(u64, u64)> {
            self.store.borrow().last_window
        }

        pub fn stored(&self) -> usize {
            self.store.borrow().items.len()
        }

        pub fn unread(&self) -> u64 {
            self.store
                .borrow()
                .items
                .iter()
                .filter(|n| !n.is_read)
                .count() as u64
        }

        async fn enter_mutation(&self) -> Result<(), ApiError> {
            let gate = {
                let mut store = self.store.borrow_mut();
                store.mutation_calls += 1;
                store.mutation_gates.pop_front()
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            match self.store.borrow_mut().mutation_failure.take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn not_found(id: &str) -> ApiError {
            ApiError::unknown(format!("Notification {} not found", id))
        }
    }

    #[async_trait(?Send)]
    impl NotificationTransport for FakeNotifications {
        async fn list_notifications(
            &self,
            filters: &NotificationFilters,
            limit: u64,
            offset: u64,
        ) -> Result<NotificationListResponse, ApiError> {
            let gate = {
                let mut store = self.store.borrow_mut();
                store.list_calls += 1;
                store.last_window = Some((limit, offset));
                store.list_gates.pop_front()
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut store = self.store.borrow_mut();
            if let Some(err) = store.list_failure.take() {
                return Err(err);
            }
            let matching: Vec<_> = store
                .items
                .iter()
                .filter(|n| filters.matches(n))
                .cloned()
                .collect();
            let unread_count = store.items.iter().filter(|n| !n.is_read).count() as u64;
            Ok(NotificationListResponse {
                total: matching.len() as u64,
                data: matching
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect(),
                unread_count,
                limit,
                offset,
            })
        }

        async fn unread_notification_count(&self) -> Result<u64, ApiError> {
            Ok(self.unread())
        }

        async fn create_notification(
            &self,
            request: &CreateNotificationRequest,
        ) -> Result<Notification, ApiError> {
            self.enter_mutation().await?;
            let mut created = notification_of_kind(
                &format!("n-new-{}", self.stored()),
                request.kind,
            );
            created.title = request.title.clone();
            created.message = request.message.clone();
            created.module = request.module.clone();
            self.push(created.clone());
            Ok(created)
        }

        async fn mark_notification_read(&self, id: &str) -> Result<Notification, ApiError> {
            self.enter_mutation().await?;
            let mut store = self.store.borrow_mut();
            let item = store
                .items
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| Self::not_found(id))?;
            item.is_read = true;
            Ok(item.clone())
        }

        async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
            self.enter_mutation().await?;
            for item in &mut self.store.borrow_mut().items {
                item.is_read = true;
            }
            Ok(())
        }

        async fn update_notification(
            &self,
            id: &str,
            request: &UpdateNotificationRequest,
        ) -> Result<Notification, ApiError> {
            self.enter_mutation().await?;
            let mut store = self.store.borrow_mut();
            let item = store
                .items
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| Self::not_found(id))?;
            if let Some(is_read) = request.is_read {
                item.is_read = is_read;
            }
            Ok(item.clone())
        }

        async fn delete_notification(&self, id: &str) -> Result<(), ApiError> {
            self.enter_mutation().await?;
            let mut store = self.store.borrow_mut();
            let before = store.items.len();
            store.items.retain(|n| n.id != id);
            if store.items.len() == before {
                return Err(Self::not_found(id));
            }
            Ok(())
        }

        async fn delete_all_notifications(&self) -> Result<(), ApiError> {
            self.enter_mutation().await?;
            self.store.borrow_mut().items.clear();
            Ok(())
        }
    }
}
