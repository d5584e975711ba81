//! Notification grouping and read-state writes.
//!
//! Notifications group into the three lanes with per-lane and total unread
//! counts. Read-state changes go back through a [`RecordWriter`] as
//! per-item patches: marking an already-read notification is a no-op,
//! and a bulk mark keeps going past individual failures.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{HarborError, Result};
use crate::model::records::AppNotification;
use crate::model::{classify_notification, time, Lane};
use crate::source::RecordWriter;

/// Notifications belonging to one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneNotifications {
    /// Which lane this group covers.
    pub lane: Lane,
    /// Notifications in the lane, in delivery order.
    pub items: Vec<AppNotification>,
    /// How many of the items are unread.
    pub unread: u32,
}

impl LaneNotifications {
    fn empty(lane: Lane) -> Self {
        Self {
            lane,
            items: Vec::new(),
            unread: 0,
        }
    }
}

/// All of a user's notifications, grouped by lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIndex {
    /// Life-tools notifications.
    pub life_tools: LaneNotifications,
    /// Curriculum notifications.
    pub curriculum: LaneNotifications,
    /// Community notifications.
    pub community: LaneNotifications,
    /// Unread count across all lanes.
    pub total_unread: u32,
}

impl Default for NotificationIndex {
    fn default() -> Self {
        Self {
            life_tools: LaneNotifications::empty(Lane::LifeTools),
            curriculum: LaneNotifications::empty(Lane::Curriculum),
            community: LaneNotifications::empty(Lane::Community),
            total_unread: 0,
        }
    }
}

impl NotificationIndex {
    /// Group notifications into lanes, preserving the given order.
    pub fn build(notifications: &[AppNotification]) -> Self {
        let mut index = NotificationIndex::default();
        for notification in notifications {
            let lane = index.lane_mut(classify_notification(&notification.kind));
            if !notification.read {
                lane.unread += 1;
            }
            lane.items.push(notification.clone());
        }
        index.total_unread =
            index.life_tools.unread + index.curriculum.unread + index.community.unread;
        index
    }

    /// The group for a lane.
    pub fn lane(&self, lane: Lane) -> &LaneNotifications {
        match lane {
            Lane::LifeTools => &self.life_tools,
            Lane::Curriculum => &self.curriculum,
            Lane::Community => &self.community,
        }
    }

    fn lane_mut(&mut self, lane: Lane) -> &mut LaneNotifications {
        match lane {
            Lane::LifeTools => &mut self.life_tools,
            Lane::Curriculum => &mut self.curriculum,
            Lane::Community => &mut self.community,
        }
    }
}

/// Sort notifications newest first; missing times sort oldest.
pub fn sort_newest_first(notifications: &mut [AppNotification]) {
    notifications.sort_by(|a, b| time::sort_key(b.created_at).cmp(&time::sort_key(a.created_at)));
}

/// Result of one per-item write in a bulk mark.
#[derive(Debug)]
pub struct MarkOutcome {
    /// Notification id the write targeted.
    pub id: String,
    /// What the write returned.
    pub result: Result<()>,
}

/// Mark one notification read.
///
/// Already-read notifications succeed without issuing a write. Unknown ids
/// are an error.
pub fn mark_as_read(
    writer: &dyn RecordWriter,
    collection: &str,
    notifications: &[AppNotification],
    id: &str,
) -> Result<()> {
    let notification = notifications
        .iter()
        .find(|n| n.id == id)
        .ok_or_else(|| HarborError::unknown_record(collection, id))?;
    if notification.read {
        return Ok(());
    }
    writer.update(collection, id, json!({"read": true}))
}

/// Mark every unread notification in a lane read, one write per item.
///
/// A failed write is recorded in its outcome and does not stop the rest.
/// Once everything in the lane is read, the next call issues no writes and
/// returns an empty list.
pub fn mark_all_for_lane(
    writer: &dyn RecordWriter,
    collection: &str,
    notifications: &[AppNotification],
    lane: Lane,
) -> Vec<MarkOutcome> {
    let mut outcomes = Vec::new();
    for notification in notifications {
        if notification.read || classify_notification(&notification.kind) != lane {
            continue;
        }
        let result = writer.update(collection, &notification.id, json!({"read": true}));
        if let Err(err) = &result {
            tracing::warn!(
                "marking notification '{}' read failed: {}",
                notification.id,
                err
            );
        }
        outcomes.push(MarkOutcome {
            id: notification.id.clone(),
            result,
        });
    }
    outcomes
}
