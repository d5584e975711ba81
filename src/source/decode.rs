//! Decode raw backend documents into typed records.
//!
//! Documents arrive loosely typed and with inconsistent field spellings
//! (snake_case from newer services, camelCase from the original client).
//! Decoding is per-field and forgiving:
//!
//! - a record missing its `id` or its owning-user id is dropped with a
//!   warning, since there is nothing coherent to aggregate for it
//! - absent or unparseable timestamps decode to `None` and sort as the epoch
//! - unknown discriminant tags are preserved in `Other` variants
//! - absent discriminants take the record's neutral default (`active` goal,
//!   `text` post, `not_started` step); absent classifiable tags stay
//!   unclassified and land in the default lane
//! - goal progress clamps to 0..=100
//!
//! Nothing in this module returns an error; the worst outcome for a bad
//! document is exclusion of that one record.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::model::records::{
    Achievement, AchievementKind, AppNotification, Goal, GoalCategory, GoalStatus, JournalEntry,
    NotificationKind, Post, PostKind, StepProgress, StepStatus, UserProfile, WellnessCheckIn,
};
use crate::model::{time, Lane};

/// Decode every document in a snapshot, warning once about drops.
pub fn decode_all<T>(
    collection: &str,
    docs: &[Value],
    decode: impl Fn(&Value) -> Option<T>,
) -> Vec<T> {
    let mut records = Vec::with_capacity(docs.len());
    let mut dropped = 0usize;
    for doc in docs {
        match decode(doc) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(
            "dropped {} of {} '{}' records with no usable id or owner",
            dropped,
            docs.len(),
            collection
        );
    }
    records
}

/// Decode a goal document.
pub fn decode_goal(doc: &Value) -> Option<Goal> {
    let id = str_field(doc, &["id"])?;
    let user_id = str_field(doc, &["user_id", "userId"])?;

    Some(Goal {
        id,
        user_id,
        title: string_or_empty(doc, &["title"]),
        category: tag_field(doc, &["category"])
            .map(|t| GoalCategory::from_tag(&t))
            .unwrap_or(GoalCategory::Other(String::new())),
        status: tag_field(doc, &["status"])
            .map(|t| GoalStatus::from_tag(&t))
            .unwrap_or(GoalStatus::Active),
        progress: int_field(doc, &["progress"])
            .map(|i| i.clamp(0, 100) as u32)
            .unwrap_or(0),
        updated_at: instant_field(doc, &["updated_at", "updatedAt", "last_updated", "lastUpdated"]),
    })
}

/// Decode a curriculum step progress document.
pub fn decode_step_progress(doc: &Value) -> Option<StepProgress> {
    let id = str_field(doc, &["id"])?;
    let user_id = str_field(doc, &["user_id", "userId"])?;

    Some(StepProgress {
        id,
        user_id,
        course_id: string_or_empty(doc, &["course_id", "courseId"]),
        status: tag_field(doc, &["status"])
            .map(|t| StepStatus::from_tag(&t))
            .unwrap_or(StepStatus::NotStarted),
        completed_at: instant_field(doc, &["completed_at", "completedAt"]),
        created_at: instant_field(doc, &["created_at", "createdAt"]),
    })
}

/// Decode a journal entry document.
pub fn decode_journal_entry(doc: &Value) -> Option<JournalEntry> {
    let id = str_field(doc, &["id"])?;
    let user_id = str_field(doc, &["user_id", "userId"])?;

    Some(JournalEntry {
        id,
        user_id,
        entry_date: instant_field(doc, &["entry_date", "entryDate", "date"]),
        mood: string_or_empty(doc, &["mood"]),
        related_step: int_field(doc, &["related_step", "relatedStep"])
            .and_then(|i| u32::try_from(i).ok())
            .filter(|s| *s >= 1),
    })
}

/// Decode an achievement document.
pub fn decode_achievement(doc: &Value) -> Option<Achievement> {
    let id = str_field(doc, &["id"])?;
    let user_id = str_field(doc, &["user_id", "userId"])?;

    Some(Achievement {
        id,
        user_id,
        kind: tag_field(doc, &["kind", "type"])
            .map(|t| AchievementKind::from_tag(&t))
            .unwrap_or(AchievementKind::Other(String::new())),
        title: string_or_empty(doc, &["title"]),
        earned_at: instant_field(doc, &["earned_at", "earnedAt"]),
    })
}

/// Decode a community post document.
pub fn decode_post(doc: &Value) -> Option<Post> {
    let id = str_field(doc, &["id"])?;
    let author_id = str_field(doc, &["author_id", "authorId", "user_id", "userId"])?;

    Some(Post {
        id,
        author_id,
        kind: tag_field(doc, &["kind", "type"])
            .map(|t| PostKind::from_tag(&t))
            .unwrap_or(PostKind::Text),
        content: string_or_empty(doc, &["content"]),
        created_at: instant_field(doc, &["created_at", "createdAt"]),
    })
}

/// Decode a notification document.
pub fn decode_notification(doc: &Value) -> Option<AppNotification> {
    let id = str_field(doc, &["id"])?;
    let user_id = str_field(doc, &["user_id", "userId"])?;

    Some(AppNotification {
        id,
        user_id,
        kind: tag_field(doc, &["kind", "type"])
            .map(|t| NotificationKind::from_tag(&t))
            .unwrap_or(NotificationKind::Other(String::new())),
        title: string_or_empty(doc, &["title"]),
        body: string_or_empty(doc, &["body", "message"]),
        read: bool_field(doc, &["read", "is_read", "isRead"]).unwrap_or(false),
        created_at: instant_field(doc, &["created_at", "createdAt"]),
    })
}

/// Decode a wellness check-in document.
pub fn decode_checkin(doc: &Value) -> Option<WellnessCheckIn> {
    let id = str_field(doc, &["id"])?;
    let user_id = str_field(doc, &["user_id", "userId"])?;

    Some(WellnessCheckIn {
        id,
        user_id,
        day: day_field(doc, &["day", "date", "checkin_date", "checkinDate"]),
        mood_score: int_field(doc, &["mood_score", "moodScore"]),
        craving_level: int_field(doc, &["craving_level", "cravingLevel"]),
        safety_rating: int_field(doc, &["safety_rating", "safetyRating"]),
    })
}

/// Decode a user profile document.
pub fn decode_user(doc: &Value) -> Option<UserProfile> {
    let id = str_field(doc, &["id", "uid"])?;

    Some(UserProfile {
        id,
        display_name: string_or_empty(doc, &["display_name", "displayName", "name"]),
        lanes: field(doc, &["lanes"])
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().and_then(Lane::parse))
                    .collect()
            })
            .unwrap_or_default(),
        current_step: int_field(doc, &["current_step", "currentStep"])
            .filter(|i| *i >= 1)
            .map(|i| i as u32)
            .unwrap_or(1),
    })
}

// ===== Field helpers =====

fn field<'a>(doc: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| doc.get(name))
        .filter(|v| !v.is_null())
}

fn str_field(doc: &Value, names: &[&str]) -> Option<String> {
    field(doc, names)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn string_or_empty(doc: &Value, names: &[&str]) -> String {
    field(doc, names)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn tag_field(doc: &Value, names: &[&str]) -> Option<String> {
    field(doc, names).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn instant_field(doc: &Value, names: &[&str]) -> Option<DateTime<Utc>> {
    field(doc, names).and_then(time::parse_instant)
}

fn day_field(doc: &Value, names: &[&str]) -> Option<NaiveDate> {
    field(doc, names).and_then(time::parse_day)
}

fn int_field(doc: &Value, names: &[&str]) -> Option<i64> {
    field(doc, names).and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
}

fn bool_field(doc: &Value, names: &[&str]) -> Option<bool> {
    field(doc, names).and_then(|v| v.as_bool())
}
