use crate::api::types::{Notification, NotificationListResponse};

/// The locally materialized window of the inbox: the items pulled so far in
/// server order, the server's counters, and how far the window reaches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationInboxState {
    pub items: Vec<Notification>,
    pub total: u64,
    pub unread_count: u64,
    pub offset: u64,
}

/// Undo record for a single optimistic read flip.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReadFlip {
    id: String,
    decremented: bool,
}

/// Undo record for a single optimistic removal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Removal {
    index: usize,
    item: Notification,
    decremented: bool,
}

impl NotificationInboxState {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.offset < self.total
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub(crate) fn replace(&mut self, page: NotificationListResponse) {
        self.offset = page.data.len() as u64;
        self.items = page.data;
        self.total = page.total;
        self.unread_count = page.unread_count;
    }

    pub(crate) fn append(&mut self, page: NotificationListResponse) {
        self.offset += page.data.len() as u64;
        self.items.extend(page.data);
        self.total = page.total;
        self.unread_count = page.unread_count;
    }

    /// Flips one item to read. Returns `None` when there was nothing to flip.
    pub(crate) fn mark_read(&mut self, id: &str) -> Option<ReadFlip> {
        let item = self.items.iter_mut().find(|n| n.id == id && !n.is_read)?;
        item.is_read = true;
        let decremented = self.unread_count > 0;
        self.unread_count = self.unread_count.saturating_sub(1);
        Some(ReadFlip {
            id: id.to_string(),
            decremented,
        })
    }

    pub(crate) fn undo_read(&mut self, flip: ReadFlip) {
        if let Some(item) = self.items.iter_mut().find(|n| n.id == flip.id) {
            item.is_read = false;
        }
        if flip.decremented {
            self.unread_count += 1;
        }
    }

    pub(crate) fn mark_all_read(&mut self) {
        for item in &mut self.items {
            item.is_read = true;
        }
        self.unread_count = 0;
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Removal> {
        let index = self.items.iter().position(|n| n.id == id)?;
        let item = self.items.remove(index);
        let decremented = !item.is_read && self.unread_count > 0;
        if decremented {
            self.unread_count -= 1;
        }
        self.total = self.total.saturating_sub(1);
        self.offset = self.offset.saturating_sub(1);
        Some(Removal {
            index,
            item,
            decremented,
        })
    }

    pub(crate) fn undo_remove(&mut self, removal: Removal) {
        let index = removal.index.min(self.items.len());
        self.items.insert(index, removal.item);
        if removal.decremented {
            self.unread_count += 1;
        }
        self.total += 1;
        self.offset += 1;
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.total = 0;
        self.unread_count = 0;
        self.offset = 0;
    }
}
