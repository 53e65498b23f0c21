use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;

use crate::api::transport::NotificationTransport;
use crate::api::types::ApiError;
use crate::notifications::filters::{NotificationFilterUpdate, NotificationFilters};
use crate::notifications::inbox::NotificationInboxState;

pub const DEFAULT_NOTIFICATION_PAGE_SIZE: u64 = 20;
pub const DEFAULT_NOTIFICATION_REFRESH_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("notification inbox has been torn down")]
    Detached,
}

/// What a list fetch request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was written into the inbox.
    Applied,
    /// Not sent: another fetch held the slot, or there was nothing left to load.
    Skipped,
    /// Sent, but the inbox moved on (new filters, teardown) before it landed.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Mutating,
}

type Listener = Rc<dyn Fn(&NotificationInboxState)>;

pub(crate) struct EngineState {
    inbox: NotificationInboxState,
    filters: NotificationFilters,
    // Generation of the list fetch holding the single slot.
    in_flight: Option<u64>,
    mutations: usize,
    generation: u64,
    // Bumped each time server state (a list page or the unread count) is applied.
    fetch_epoch: u64,
    // Shared with auto-refresh handles so they can detach without a borrow.
    pub(crate) detached: Rc<Cell<bool>>,
    pub(crate) timer: Option<Rc<Cell<bool>>>,
    listeners: Vec<Listener>,
}

impl EngineState {
    fn is_detached(&self) -> bool {
        self.detached.get()
    }

    /// Stops everything attached to this inbox. Responses still in flight
    /// will see the bumped generation and be dropped.
    pub(crate) fn detach(&mut self) {
        self.detached.set(true);
        self.generation += 1;
        self.in_flight = None;
        self.listeners.clear();
        if let Some(timer) = self.timer.take() {
            timer.set(true);
        }
    }
}

/// Keeps one notification inbox in step with the server.
///
/// Three sources change the inbox: list fetches (`refresh`, `load_more`,
/// `set_filters` and the auto-refresh timer), optimistic mutations, and
/// teardown. At most one list fetch is in flight; a second one is skipped,
/// not queued. A list response always overwrites local state when it lands,
/// including optimistic edits made while it was pending.
#[derive(Clone)]
pub struct NotificationSyncEngine {
    pub(crate) inner: Rc<RefCell<EngineState>>,
    transport: Rc<dyn NotificationTransport>,
    page_size: u64,
}

impl NotificationSyncEngine {
    pub fn new(transport: Rc<dyn NotificationTransport>, page_size: u64) -> Self {
        Self::with_filters(transport, page_size, NotificationFilters::default())
    }

    pub fn with_filters(
        transport: Rc<dyn NotificationTransport>,
        page_size: u64,
        filters: NotificationFilters,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EngineState {
                inbox: NotificationInboxState::default(),
                filters,
                in_flight: None,
                mutations: 0,
                generation: 0,
                fetch_epoch: 0,
                detached: Rc::new(Cell::new(false)),
                timer: None,
                listeners: Vec::new(),
            })),
            transport,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn state(&self) -> NotificationInboxState {
        self.inner.borrow().inbox.clone()
    }

    pub fn filters(&self) -> NotificationFilters {
        self.inner.borrow().filters.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        let state = self.inner.borrow();
        if state.in_flight.is_some() {
            SyncPhase::Fetching
        } else if state.mutations > 0 {
            SyncPhase::Mutating
        } else {
            SyncPhase::Idle
        }
    }

    pub fn is_detached(&self) -> bool {
        self.inner.borrow().is_detached()
    }

    /// Registers a callback run with the new inbox after every local change.
    pub fn subscribe(&self, listener: impl Fn(&NotificationInboxState) + 'static) {
        let mut state = self.inner.borrow_mut();
        if !state.is_detached() {
            state.listeners.push(Rc::new(listener));
        }
    }

    fn notify(&self) {
        let (listeners, snapshot) = {
            let state = self.inner.borrow();
            if state.listeners.is_empty() {
                return;
            }
            (state.listeners.clone(), state.inbox.clone())
        };
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn ensure_attached(&self) -> Result<(), SyncError> {
        if self.inner.borrow().is_detached() {
            Err(SyncError::Detached)
        } else {
            Ok(())
        }
    }

    /// Claims the fetch slot. `None` means another fetch already holds it.
    fn begin_fetch(&self) -> Result<Option<u64>, SyncError> {
        let mut state = self.inner.borrow_mut();
        if state.is_detached() {
            return Err(SyncError::Detached);
        }
        if state.in_flight.is_some() {
            return Ok(None);
        }
        let ticket = state.generation;
        state.in_flight = Some(ticket);
        Ok(Some(ticket))
    }

    /// Releases the slot if `ticket` still holds it and reports whether the
    /// response may be applied.
    fn finish_fetch(&self, ticket: u64) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.in_flight == Some(ticket) {
            state.in_flight = None;
        }
        !state.is_detached() && state.generation == ticket
    }

    /// Fetches the first page with the current filters and replaces the
    /// window with it. Appended pages are dropped.
    pub async fn refresh(&self) -> Result<FetchOutcome, SyncError> {
        let Some(ticket) = self.begin_fetch()? else {
            log::debug!("notification refresh skipped: fetch in flight");
            return Ok(FetchOutcome::Skipped);
        };
        let filters = self.filters();

        let result = self
            .transport
            .list_notifications(&filters, self.page_size, 0)
            .await;

        if !self.finish_fetch(ticket) {
            log::debug!("stale notification page discarded");
            return Ok(FetchOutcome::Discarded);
        }
        let page = result?;
        {
            let mut state = self.inner.borrow_mut();
            state.inbox.replace(page);
            state.fetch_epoch += 1;
        }
        self.notify();
        Ok(FetchOutcome::Applied)
    }

    /// Fetches the page after the current window and appends it.
    pub async fn load_more(&self) -> Result<FetchOutcome, SyncError> {
        let offset = {
            let state = self.inner.borrow();
            if state.is_detached() {
                return Err(SyncError::Detached);
            }
            if state.in_flight.is_some() || !state.inbox.has_more() {
                return Ok(FetchOutcome::Skipped);
            }
            state.inbox.offset
        };
        let Some(ticket) = self.begin_fetch()? else {
            return Ok(FetchOutcome::Skipped);
        };
        let filters = self.filters();

        let result = self
            .transport
            .list_notifications(&filters, self.page_size, offset)
            .await;

        if !self.finish_fetch(ticket) {
            return Ok(FetchOutcome::Discarded);
        }
        let page = result?;
        {
            let mut state = self.inner.borrow_mut();
            state.inbox.append(page);
            state.fetch_epoch += 1;
        }
        self.notify();
        Ok(FetchOutcome::Applied)
    }

    /// One auto-refresh step: a refresh unless a fetch or a mutation is
    /// already in flight.
    pub async fn tick(&self) -> Result<FetchOutcome, SyncError> {
        {
            let state = self.inner.borrow();
            if state.is_detached() {
                return Err(SyncError::Detached);
            }
            if state.in_flight.is_some() || state.mutations > 0 {
                return Ok(FetchOutcome::Skipped);
            }
        }
        self.refresh().await
    }

    /// Merges `update` into the filters and refreshes. A fetch still pending
    /// under the old filters is superseded and its response discarded.
    pub async fn set_filters(
        &self,
        update: NotificationFilterUpdate,
    ) -> Result<FetchOutcome, SyncError> {
        {
            let mut state = self.inner.borrow_mut();
            if state.is_detached() {
                return Err(SyncError::Detached);
            }
            state.filters.apply(update);
            state.generation += 1;
            state.in_flight = None;
        }
        self.refresh().await
    }

    /// Polls the unread counter alone. Skipped while a list fetch is pending
    /// since that response carries the counter too. An applied count counts
    /// as server state, so pending mutations no longer undo onto it.
    pub async fn refresh_unread_count(&self) -> Result<Option<u64>, SyncError> {
        {
            let state = self.inner.borrow();
            if state.is_detached() {
                return Err(SyncError::Detached);
            }
            if state.in_flight.is_some() {
                return Ok(None);
            }
        }
        let count = self.transport.unread_notification_count().await?;
        {
            let mut state = self.inner.borrow_mut();
            if state.is_detached() {
                return Ok(None);
            }
            state.inbox.unread_count = count;
            state.fetch_epoch += 1;
        }
        self.notify();
        Ok(Some(count))
    }

    fn begin_mutation(&self) -> Result<u64, SyncError> {
        let mut state = self.inner.borrow_mut();
        if state.is_detached() {
            return Err(SyncError::Detached);
        }
        state.mutations += 1;
        Ok(state.fetch_epoch)
    }

    /// Ends a mutation; `true` when an undo may still be applied, i.e. the
    /// inbox is attached and no list response replaced it meanwhile.
    fn end_mutation(&self, epoch: u64) -> bool {
        let mut state = self.inner.borrow_mut();
        state.mutations = state.mutations.saturating_sub(1);
        !state.is_detached() && state.fetch_epoch == epoch
    }

    fn require_id(id: &str) -> Result<(), SyncError> {
        if id.trim().is_empty() {
            Err(SyncError::Validation("notification id is required".into()))
        } else {
            Ok(())
        }
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<(), SyncError> {
        Self::require_id(id)?;
        let epoch = self.begin_mutation()?;
        let flip = self.inner.borrow_mut().inbox.mark_read(id);
        if flip.is_some() {
            self.notify();
        }

        let result = self.transport.mark_notification_read(id).await;

        let may_undo = self.end_mutation(epoch);
        if let Err(err) = result {
            if let (true, Some(flip)) = (may_undo, flip) {
                self.inner.borrow_mut().inbox.undo_read(flip);
                self.notify();
            }
            log::warn!("mark notification {} read failed: {}", id, err);
            return Err(err.into());
        }
        Ok(())
    }

    /// Marks everything read locally and on the server. A failure is
    /// reported but not undone; the next refresh corrects the inbox.
    pub async fn mark_all_as_read(&self) -> Result<(), SyncError> {
        self.begin_mutation()?;
        self.inner.borrow_mut().inbox.mark_all_read();
        self.notify();

        let result = self.transport.mark_all_notifications_read().await;
        {
            let mut state = self.inner.borrow_mut();
            state.mutations = state.mutations.saturating_sub(1);
        }
        result.map_err(|err| {
            log::warn!("mark all notifications read failed: {}", err);
            err.into()
        })
    }

    pub async fn delete_one(&self, id: &str) -> Result<(), SyncError> {
        Self::require_id(id)?;
        let epoch = self.begin_mutation()?;
        let removal = self.inner.borrow_mut().inbox.remove(id);
        if removal.is_some() {
            self.notify();
        }

        let result = self.transport.delete_notification(id).await;

        let may_undo = self.end_mutation(epoch);
        if let Err(err) = result {
            if let (true, Some(removal)) = (may_undo, removal) {
                self.inner.borrow_mut().inbox.undo_remove(removal);
                self.notify();
            }
            log::warn!("delete notification {} failed: {}", id, err);
            return Err(err.into());
        }
        Ok(())
    }

    /// Empties the inbox locally and on the server. Like `mark_all_as_read`
    /// there is no undo on failure.
    pub async fn delete_all(&self) -> Result<(), SyncError> {
        self.begin_mutation()?;
        self.inner.borrow_mut().inbox.clear();
        self.notify();

        let result = self.transport.delete_all_notifications().await;
        {
            let mut state = self.inner.borrow_mut();
            state.mutations = state.mutations.saturating_sub(1);
        }
        result.map_err(|err| {
            log::warn!("delete all notifications failed: {}", err);
            err.into()
        })
    }

    /// Detaches the inbox from its view: the timer stops, listeners are
    /// dropped and responses still in flight are ignored. Every later call
    /// fails with [`SyncError::Detached`].
    pub fn teardown(&self) {
        self.inner.borrow_mut().detach();
        log::debug!("notification inbox torn down");
    }
}
