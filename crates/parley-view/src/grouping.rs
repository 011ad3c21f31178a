//! Visual runs of consecutive bubbles from the same sender.
//!
//! A run ends when the sender changes, a non-message row intervenes, or the
//! gap between two messages exceeds [`GroupingConfig::run_gap_ms`]. The last
//! bubble of a run carries the avatar and the time label; in group chats the
//! first bubble of a run carries the sender's name.

use parley_types::models::Message;

use crate::materialize::ListItem;

pub const DEFAULT_RUN_GAP_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingConfig {
    /// Largest gap, in milliseconds, that still joins two bubbles into one run
    pub run_gap_ms: i64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            run_gap_ms: DEFAULT_RUN_GAP_MS,
        }
    }
}

/// Per-row rendering flags. All false for non-message rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BubbleFlags {
    pub show_avatar: bool,
    pub show_timestamp: bool,
    pub show_sender_name: bool,
}

impl GroupingConfig {
    fn same_run(&self, a: &Message, b: &Message) -> bool {
        if a.sender_id != b.sender_id {
            return false;
        }
        match (a.timestamp.millis(), b.timestamp.millis()) {
            (Some(x), Some(y)) => (y - x).abs() <= self.run_gap_ms,
            _ => false,
        }
    }

    /// True for the final bubble of a run.
    pub fn ends_run(&self, items: &[ListItem], index: usize) -> bool {
        let Some(current) = items.get(index).and_then(ListItem::as_message) else {
            return false;
        };
        match items.get(index + 1).and_then(ListItem::as_message) {
            Some(next) => !self.same_run(current, next),
            None => true,
        }
    }

    /// True for the first bubble of a run.
    pub fn starts_run(&self, items: &[ListItem], index: usize) -> bool {
        let Some(current) = items.get(index).and_then(ListItem::as_message) else {
            return false;
        };
        let previous = index
            .checked_sub(1)
            .and_then(|i| items.get(i))
            .and_then(ListItem::as_message);
        match previous {
            Some(prev) => !self.same_run(prev, current),
            None => true,
        }
    }

    pub fn annotate(&self, items: &[ListItem], is_group: bool, viewer_id: &str) -> Vec<BubbleFlags> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let Some(msg) = item.as_message() else {
                    return BubbleFlags::default();
                };
                let last = self.ends_run(items, i);
                BubbleFlags {
                    show_avatar: last,
                    show_timestamp: last,
                    show_sender_name: is_group && !msg.is_from(viewer_id) && self.starts_run(items, i),
                }
            })
            .collect()
    }
}

/// Whether the bubble at `index` shows the sender's avatar.
pub fn should_show_avatar(items: &[ListItem], index: usize) -> bool {
    GroupingConfig::default().ends_run(items, index)
}

/// Whether the bubble at `index` shows its time label.
pub fn should_show_timestamp(items: &[ListItem], index: usize) -> bool {
    GroupingConfig::default().ends_run(items, index)
}

/// Whether the bubble at `index` shows the sender's name above it.
pub fn should_show_sender_name(items: &[ListItem], index: usize, is_group: bool, viewer_id: &str) -> bool {
    is_group
        && items
            .get(index)
            .and_then(ListItem::as_message)
            .is_some_and(|m| !m.is_from(viewer_id))
        && GroupingConfig::default().starts_run(items, index)
}

pub fn group_annotations(items: &[ListItem], is_group: bool, viewer_id: &str) -> Vec<BubbleFlags> {
    GroupingConfig::default().annotate(items, is_group, viewer_id)
}
