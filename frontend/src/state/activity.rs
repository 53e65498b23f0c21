use std::cell::Cell;
use std::rc::Rc;

use leptos::*;

use crate::activity::{ActivityEvent, ActivityMirror, ActivitySummary, SubscriptionId};
use crate::api::transport::AuditTransport;
use crate::api::ApiClient;
use crate::audit::{AuditEventEmitter, AuditFilters, AuditQueryService, QueryError};
use crate::config::{self, RuntimeConfig};

/// The audit-facing services shared by every view of the session. The mirror
/// is created here once and handed to the emitter, so both see the same feed.
#[derive(Clone)]
pub struct ActivityServices {
    pub mirror: ActivityMirror,
    pub emitter: AuditEventEmitter,
    pub audit: AuditQueryService,
}

impl ActivityServices {
    pub fn new(api: Rc<ApiClient>, config: &RuntimeConfig) -> Self {
        Self::with_transport(api, config)
    }

    pub fn with_transport(transport: Rc<dyn AuditTransport>, config: &RuntimeConfig) -> Self {
        let mirror = ActivityMirror::new(config.activity_capacity);
        let audit = AuditQueryService::new(transport, config.audit_page_size);
        let emitter = AuditEventEmitter::new(audit.clone(), mirror.clone());
        Self {
            mirror,
            emitter,
            audit,
        }
    }

    /// Pulls the latest audit page and stats into the mirror so actions made
    /// elsewhere show up in the feed.
    pub async fn sync_from_server(&self) -> Result<usize, QueryError> {
        let limit = self.mirror.capacity() as u64;
        let page = self
            .audit
            .query(&AuditFilters::page(1, limit.min(crate::audit::query::MAX_AUDIT_PAGE_SIZE)))
            .await?;
        let added = self.mirror.merge_confirmed(&page.items);
        let stats = self.audit.stats(None).await?;
        self.mirror.set_summary(&stats);
        Ok(added)
    }
}

pub fn provide_activity_services(services: ActivityServices) {
    provide_context(services);
}

pub fn use_activity_services() -> ActivityServices {
    match use_context::<ActivityServices>() {
        Some(services) => services,
        None => {
            let api = use_context::<ApiClient>().unwrap_or_else(ApiClient::new);
            let services = ActivityServices::new(Rc::new(api), &config::current());
            provide_context(services.clone());
            services
        }
    }
}

/// Keeps `update` subscribed while the calling owner is alive. `update`
/// returns `false` once its signal is gone, which also unsubscribes it; that
/// covers runtimes dropped without running their cleanups.
fn follow_mirror(mirror: &ActivityMirror, update: impl Fn(&ActivityMirror) -> bool + 'static) {
    let slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
    let own = slot.clone();
    let id = mirror.subscribe(move |mirror| {
        if !update(mirror) {
            if let Some(id) = own.get() {
                mirror.unsubscribe(id);
            }
        }
    });
    slot.set(Some(id));
    let mirror = mirror.clone();
    on_cleanup(move || mirror.unsubscribe(id));
}

/// The newest `limit` feed entries, kept current as the mirror changes.
pub fn use_recent_activity(limit: usize) -> ReadSignal<Vec<ActivityEvent>> {
    let services = use_activity_services();
    let (events, set_events) = create_signal(services.mirror.list(limit));
    follow_mirror(&services.mirror, move |mirror| {
        set_events.try_set(mirror.list(limit)).is_none()
    });
    events
}

pub fn use_activity_summary() -> ReadSignal<Option<ActivitySummary>> {
    let services = use_activity_services();
    let (summary, set_summary) = create_signal(services.mirror.summary());
    follow_mirror(&services.mirror, move |mirror| {
        set_summary.try_set(mirror.summary()).is_none()
    });
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use leptos::create_runtime;

    fn with_runtime<T>(test: impl FnOnce() -> T) -> T {
        let runtime = create_runtime();
        let result = test();
        runtime.dispose();
        result
    }

    #[test]
    fn use_activity_services_provides_one_shared_instance() {
        with_runtime(|| {
            let first = use_activity_services();
            first
                .mirror
                .record(crate::activity::NewActivity::new(
                    crate::activity::ActivityKind::View,
                    "navigation",
                    "Module viewed - dashboard",
                ));
            let second = use_activity_services();
            assert_eq!(second.mirror.len(), 1);
            assert_eq!(second.mirror.capacity(), 50);
        });
    }

    fn shared_services() -> ActivityServices {
        ActivityServices::new(Rc::new(ApiClient::new()), &RuntimeConfig::default())
    }

    fn sale() -> crate::activity::NewActivity {
        crate::activity::NewActivity::new(
            crate::activity::ActivityKind::Sale,
            "sales",
            "Sale completed - Amount: 3.00",
        )
    }

    #[test]
    fn unmounted_views_unsubscribe_from_the_feed() {
        let shared = shared_services();
        with_runtime(|| {
            provide_activity_services(shared.clone());
            let mount = as_child_of_current_owner(|limit: usize| {
                (use_recent_activity(limit), use_activity_summary())
            });

            let ((recent, _), kept) = mount(5);
            for _ in 0..100 {
                let (_, disposer) = mount(5);
                drop(disposer);
            }
            assert_eq!(shared.mirror.listener_count(), 2);

            shared.mirror.record(sale());
            assert_eq!(recent.get_untracked().len(), 1);
            drop(kept);
            assert_eq!(shared.mirror.listener_count(), 0);
        });
    }

    #[test]
    fn listeners_of_dropped_runtimes_are_pruned_on_the_next_change() {
        let shared = shared_services();
        for _ in 0..100 {
            let runtime = create_runtime();
            provide_activity_services(shared.clone());
            let _recent = use_recent_activity(5);
            let _summary = use_activity_summary();
            runtime.dispose();
        }

        shared.mirror.record(sale());
        assert_eq!(shared.mirror.listener_count(), 0);
        assert_eq!(shared.mirror.len(), 1);
    }
}
