use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::types::{AuditAction, AuditStats};

pub const DEFAULT_ACTIVITY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Login,
    Logout,
    Sale,
    StockIn,
    StockOut,
    StockAdjustment,
    Scan,
    ProductCreate,
    Payment,
    RegisterOpen,
    RegisterClose,
    View,
    Report,
    Export,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    pub kind: ActivityKind,
    pub module: String,
    pub description: String,
    pub user_id: Option<String>,
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Input to [`ActivityMirror::record`]; id and timestamp are filled in when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub id: Option<String>,
    pub kind: ActivityKind,
    pub module: String,
    pub description: String,
    pub user_id: Option<String>,
    pub metadata: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewActivity {
    pub fn new(kind: ActivityKind, module: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            module: module.into(),
            description: description.into(),
            user_id: None,
            metadata: None,
            timestamp: None,
        }
    }
}

impl From<&AuditAction> for NewActivity {
    fn from(action: &AuditAction) -> Self {
        Self {
            id: Some(action.id.clone()),
            kind: action.action.activity_kind(),
            module: action
                .module
                .clone()
                .unwrap_or_else(|| action.action.module().to_string()),
            description: action.description.clone(),
            user_id: Some(action.user.id.clone()),
            metadata: (!action.metadata.is_null()).then(|| action.metadata.clone()),
            timestamp: Some(action.created_at),
        }
    }
}

/// Aggregate counts shown next to the feed, taken from the audit stats endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivitySummary {
    pub total: u64,
    pub today: u64,
    pub top_action: Option<String>,
}

impl From<&AuditStats> for ActivitySummary {
    fn from(stats: &AuditStats) -> Self {
        Self {
            total: stats.total_actions,
            today: stats.today_actions,
            top_action: stats
                .top_actions
                .iter()
                .max_by_key(|a| a.count)
                .map(|a| a.action.clone()),
        }
    }
}

type Listener = Rc<dyn Fn(&ActivityMirror)>;

/// Returned by [`ActivityMirror::subscribe`]; pass it to
/// [`ActivityMirror::unsubscribe`] to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct MirrorState {
    events: VecDeque<ActivityEvent>,
    capacity: usize,
    // Server ids of actions already shown under their local id.
    acknowledged: VecDeque<String>,
    summary: Option<ActivitySummary>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl MirrorState {
    fn knows(&self, id: &str) -> bool {
        self.events.iter().any(|e| e.id == id) || self.acknowledged.iter().any(|a| a == id)
    }

    /// Places `event` by timestamp. Returns `false` when the feed is full and
    /// the event is older than all of it, in which case nothing changes.
    fn insert_by_time(&mut self, event: ActivityEvent) -> bool {
        let at = self
            .events
            .iter()
            .position(|e| e.timestamp <= event.timestamp)
            .unwrap_or(self.events.len());
        if at >= self.capacity {
            return false;
        }
        self.events.insert(at, event);
        if self.events.len() > self.capacity {
            self.events.pop_back();
        }
        true
    }
}

fn into_event(activity: NewActivity) -> ActivityEvent {
    ActivityEvent {
        id: activity
            .id
            .unwrap_or_else(|| format!("local-{}", Uuid::new_v4())),
        kind: activity.kind,
        module: activity.module,
        description: activity.description,
        user_id: activity.user_id,
        metadata: activity.metadata,
        timestamp: activity.timestamp.unwrap_or_else(Utc::now),
    }
}

/// Bounded, newest-first feed of recent activity.
///
/// Cloning gives another handle to the same feed. `record` and
/// `merge_confirmed` are the only writers; entries are never edited, and the
/// oldest one is evicted from the back once the bound is reached.
#[derive(Clone)]
pub struct ActivityMirror {
    inner: Rc<RefCell<MirrorState>>,
}

impl Default for ActivityMirror {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

impl ActivityMirror {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Rc::new(RefCell::new(MirrorState {
                events: VecDeque::with_capacity(capacity),
                capacity,
                acknowledged: VecDeque::new(),
                summary: None,
                listeners: Vec::new(),
                next_subscription: 0,
            })),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().events.is_empty()
    }

    pub fn record(&self, activity: NewActivity) -> ActivityEvent {
        let event = into_event(activity);
        {
            let mut state = self.inner.borrow_mut();
            state.events.push_front(event.clone());
            if state.events.len() > state.capacity {
                state.events.pop_back();
            }
        }
        self.notify();
        event
    }

    /// The first `limit` events, newest first. Reading never changes the feed.
    pub fn list(&self, limit: usize) -> Vec<ActivityEvent> {
        self.inner
            .borrow()
            .events
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Marks a server id as already shown, so a later `merge_confirmed` does
    /// not add the same action a second time under its server id.
    pub fn acknowledge(&self, server_id: impl Into<String>) {
        let mut state = self.inner.borrow_mut();
        state.acknowledged.push_back(server_id.into());
        let cap = state.capacity * 4;
        while state.acknowledged.len() > cap {
            state.acknowledged.pop_front();
        }
    }

    /// Folds server-confirmed audit actions into the feed. Known ids are
    /// skipped; the rest are placed by timestamp so the feed stays newest
    /// first. Returns how many are in the feed afterwards.
    pub fn merge_confirmed(&self, actions: &[AuditAction]) -> usize {
        let added = {
            let mut state = self.inner.borrow_mut();
            let mut seen = HashSet::new();
            let mut fresh: Vec<&AuditAction> = actions
                .iter()
                .filter(|a| !state.knows(&a.id) && seen.insert(a.id.as_str()))
                .collect();
            fresh.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let inserted: Vec<String> = fresh
                .into_iter()
                .filter(|action| state.insert_by_time(into_event(NewActivity::from(*action))))
                .map(|action| action.id.clone())
                .collect();
            inserted
                .iter()
                .filter(|id| state.events.iter().any(|e| &e.id == *id))
                .count()
        };
        if added > 0 {
            self.notify();
        }
        added
    }

    pub fn set_summary(&self, stats: &AuditStats) {
        self.inner.borrow_mut().summary = Some(ActivitySummary::from(stats));
        self.notify();
    }

    pub fn summary(&self) -> Option<ActivitySummary> {
        self.inner.borrow().summary.clone()
    }

    /// Empties the feed, e.g. when the session ends.
    pub fn reset(&self) {
        {
            let mut state = self.inner.borrow_mut();
            state.events.clear();
            state.acknowledged.clear();
            state.summary = None;
        }
        self.notify();
    }

    /// Registers a callback run after every change to the feed or summary.
    /// The mirror outlives views, so views unsubscribe when they go away.
    pub fn subscribe(&self, listener: impl Fn(&ActivityMirror) + 'static) -> SubscriptionId {
        let mut state = self.inner.borrow_mut();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.borrow_mut().listeners.retain(|(sub, _)| *sub != id);
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(self);
        }
    }
}
