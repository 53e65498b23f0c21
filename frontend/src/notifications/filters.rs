use crate::api::types::NotificationType;

/// Server-side filters for the inbox list. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilters {
    pub kind: Option<NotificationType>,
    pub module: Option<String>,
    pub is_read: Option<bool>,
    pub search: Option<String>,
}

fn type_tag(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::Info => "info",
        NotificationType::Success => "success",
        NotificationType::Warning => "warning",
        NotificationType::Error => "error",
        NotificationType::System => "system",
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl NotificationFilters {
    pub fn unread_only() -> Self {
        Self {
            is_read: Some(false),
            ..Self::default()
        }
    }

    pub fn query_pairs(&self, limit: u64, offset: u64) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(kind) = self.kind {
            params.push(("type", type_tag(kind).to_string()));
        }
        if let Some(module) = non_blank(&self.module) {
            params.push(("module", module.to_string()));
        }
        if let Some(is_read) = self.is_read {
            params.push(("isRead", is_read.to_string()));
        }
        if let Some(search) = non_blank(&self.search) {
            params.push(("search", search.to_string()));
        }
        params.push(("limit", limit.to_string()));
        params.push(("offset", offset.to_string()));
        params
    }

    /// Same predicate the server applies; search is a case-insensitive
    /// substring match on title and message. Used by the in-memory transport.
    #[cfg(test)]
    pub(crate) fn matches(&self, notification: &crate::api::types::Notification) -> bool {
        if self.kind.is_some_and(|k| k != notification.kind) {
            return false;
        }
        if let Some(module) = non_blank(&self.module) {
            if notification.module.as_deref() != Some(module) {
                return false;
            }
        }
        if self.is_read.is_some_and(|r| r != notification.is_read) {
            return false;
        }
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            return notification.title.to_lowercase().contains(&needle)
                || notification.message.to_lowercase().contains(&needle);
        }
        true
    }

    pub fn apply(&mut self, update: NotificationFilterUpdate) {
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(module) = update.module {
            self.module = module;
        }
        if let Some(is_read) = update.is_read {
            self.is_read = is_read;
        }
        if let Some(search) = update.search {
            self.search = search;
        }
    }
}

/// Partial filter change. An outer `None` leaves the field alone, `Some(None)`
/// clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilterUpdate {
    pub kind: Option<Option<NotificationType>>,
    pub module: Option<Option<String>>,
    pub is_read: Option<Option<bool>>,
    pub search: Option<Option<String>>,
}

impl NotificationFilterUpdate {
    pub fn kind(mut self, kind: Option<NotificationType>) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn module(mut self, module: Option<&str>) -> Self {
        self.module = Some(module.map(str::to_string));
        self
    }

    pub fn is_read(mut self, is_read: Option<bool>) -> Self {
        self.is_read = Some(is_read);
        self
    }

    pub fn search(mut self, search: Option<&str>) -> Self {
        self.search = Some(search.map(str::to_string));
        self
    }

    /// Resets every field.
    pub fn clear() -> Self {
        Self::default()
            .kind(None)
            .module(None)
            .is_read(None)
            .search(None)
    }
}


#[cfg(all(test, not(target_arch = "wasm32")))]
mod host_tests {
    use super::*;
    use crate::api::test_support::fakes::{notification, notification_of_kind};

    #[test]
    fn matches_applies_every_set_field() {
        let filters = NotificationFilters {
            kind: Some(NotificationType::Warning),
            module: Some("inventory".into()),
            search: Some("BELOW".into()),
            ..NotificationFilters::default()
        };
        assert!(filters.matches(&notification_of_kind("w-1", NotificationType::Warning)));
        assert!(!filters.matches(&notification_of_kind("e-1", NotificationType::Error)));

        let unread = NotificationFilters::unread_only();
        assert!(unread.matches(&notification("n-1", false)));
        assert!(!unread.matches(&notification("n-2", true)));
    }
}
