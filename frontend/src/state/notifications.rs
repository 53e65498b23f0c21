use std::rc::Rc;
use std::time::Duration;

use leptos::*;

use crate::api::ApiClient;
use crate::config::{self, RuntimeConfig};
use crate::notifications::{NotificationInboxState, NotificationSyncEngine};
use crate::utils::runtime::spawn_local;

/// An inbox bound to the current view: the engine for commands, and a signal
/// mirroring its state for rendering.
#[derive(Clone)]
pub struct NotificationInbox {
    pub engine: NotificationSyncEngine,
    pub state: ReadSignal<NotificationInboxState>,
}

pub fn notification_engine(api: Rc<ApiClient>, config: &RuntimeConfig) -> NotificationSyncEngine {
    NotificationSyncEngine::new(api, config.notification_page_size)
}

/// Wires `engine` to the calling view. The first page is requested right
/// away, `auto_refresh` starts the periodic refresh, and the engine is torn
/// down when the view's owner is cleaned up.
pub fn use_notification_inbox(
    engine: NotificationSyncEngine,
    auto_refresh: Option<Duration>,
) -> NotificationInbox {
    let (state, set_state) = create_signal(engine.state());
    engine.subscribe(move |inbox| {
        set_state.try_set(inbox.clone());
    });

    if let Some(period) = auto_refresh {
        store_value(engine.start_auto_refresh(period));
    }

    let for_cleanup = engine.clone();
    on_cleanup(move || for_cleanup.teardown());

    let initial = engine.clone();
    spawn_local(async move {
        if let Err(err) = initial.refresh().await {
            log::warn!("initial notification load failed: {}", err);
        }
    });

    NotificationInbox { engine, state }
}

/// Inbox over the shared `ApiClient` with the configured page size and
/// refresh period.
pub fn use_default_notification_inbox() -> NotificationInbox {
    let config = config::current();
    let api = use_context::<ApiClient>().unwrap_or_else(ApiClient::new);
    use_notification_inbox(
        notification_engine(Rc::new(api), &config),
        Some(config.notification_refresh_interval()),
    )
}
