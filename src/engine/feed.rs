//! The merged activity feed.
//!
//! Five record kinds map into one [`ActivityItem`] shape, concatenate in a
//! fixed source order, and sort newest first. Items without a timestamp
//! sink to the bottom rather than disappearing. The feed is capped at
//! [`FEED_LIMIT`] entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::records::{Achievement, Goal, JournalEntry, Post, PostKind, StepProgress};
use crate::model::{classify_achievement, time, Lane};

/// Maximum entries in the merged feed.
pub const FEED_LIMIT: usize = 20;

const CONTENT_PREVIEW_MAX: usize = 80;
const CONTENT_PREVIEW_KEPT: usize = 77;

/// What kind of activity an item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    GoalCompleted,
    GoalCreated,
    StepCompleted,
    JournalEntry,
    AchievementEarned,
    StoryShared,
    PostCreated,
}

/// One entry of the merged activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityItem {
    /// Feed-unique identifier, prefixed by the source record kind.
    pub id: String,
    /// Activity discriminant.
    pub kind: ActivityKind,
    /// Short fixed headline.
    pub title: String,
    /// Record-specific detail line.
    pub description: String,
    /// When the activity happened, if known.
    pub timestamp: Option<DateTime<Utc>>,
    /// Lane the activity belongs to.
    pub lane: Lane,
    /// In-app route to the underlying record.
    pub link: String,
}

/// Map a goal into its feed item.
pub fn goal_activity(goal: &Goal) -> ActivityItem {
    let (kind, title) = if goal.is_completed() {
        (ActivityKind::GoalCompleted, "Goal completed")
    } else {
        (ActivityKind::GoalCreated, "Goal created")
    };
    ActivityItem {
        id: format!("goal-{}", goal.id),
        kind,
        title: title.to_string(),
        description: goal.title.clone(),
        timestamp: goal.updated_at,
        lane: Lane::LifeTools,
        link: format!("/goals/{}", goal.id),
    }
}

/// Map a step completion into its feed item.
///
/// Only completed steps with a completion time appear in the feed.
pub fn step_activity(step: &StepProgress) -> Option<ActivityItem> {
    let completed_at = step.completed_at?;
    if !step.is_completed() {
        return None;
    }
    Some(ActivityItem {
        id: format!("step-{}", step.id),
        kind: ActivityKind::StepCompleted,
        title: "Step completed".to_string(),
        description: format!("Completed {}", step.course_id),
        timestamp: Some(completed_at),
        lane: Lane::Curriculum,
        link: format!("/steps/{}", step.course_id),
    })
}

/// Map a journal entry into its feed item.
pub fn journal_activity(entry: &JournalEntry) -> ActivityItem {
    let description = match entry.related_step {
        Some(step) => format!("Reflection for Step {}", step),
        None => format!("Mood: {}", entry.mood),
    };
    ActivityItem {
        id: format!("journal-{}", entry.id),
        kind: ActivityKind::JournalEntry,
        title: "Journal entry".to_string(),
        description,
        timestamp: entry.entry_date,
        lane: Lane::Curriculum,
        link: format!("/journal/{}", entry.id),
    }
}

/// Map an achievement into its feed item.
pub fn achievement_activity(achievement: &Achievement) -> ActivityItem {
    ActivityItem {
        id: format!("achievement-{}", achievement.id),
        kind: ActivityKind::AchievementEarned,
        title: "Achievement earned".to_string(),
        description: achievement.title.clone(),
        timestamp: achievement.earned_at,
        lane: classify_achievement(&achievement.kind),
        link: "/achievements".to_string(),
    }
}

/// Map a community post into its feed item.
pub fn post_activity(post: &Post) -> ActivityItem {
    let (kind, title) = if post.kind == PostKind::Story {
        (ActivityKind::StoryShared, "Story shared")
    } else {
        (ActivityKind::PostCreated, "New post")
    };
    ActivityItem {
        id: format!("post-{}", post.id),
        kind,
        title: title.to_string(),
        description: preview(&post.content),
        timestamp: post.created_at,
        lane: Lane::Community,
        link: format!("/community/{}", post.id),
    }
}

/// Merge all sources into one feed, newest first, capped at [`FEED_LIMIT`].
///
/// Concatenation order is fixed (goals, steps, journals, achievements,
/// posts) and the sort is stable, so equal timestamps keep that order.
pub fn merge_feed(
    goals: &[Goal],
    steps: &[StepProgress],
    journals: &[JournalEntry],
    achievements: &[Achievement],
    posts: &[Post],
) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = Vec::new();
    items.extend(goals.iter().map(goal_activity));
    items.extend(steps.iter().filter_map(step_activity));
    items.extend(journals.iter().map(journal_activity));
    items.extend(achievements.iter().map(achievement_activity));
    items.extend(posts.iter().map(post_activity));
    items.sort_by(|a, b| time::sort_key(b.timestamp).cmp(&time::sort_key(a.timestamp)));
    items.truncate(FEED_LIMIT);
    items
}

/// Clip long post content to a fixed-width preview, counting characters
/// rather than bytes.
fn preview(content: &str) -> String {
    if content.chars().count() > CONTENT_PREVIEW_MAX {
        let kept: String = content.chars().take(CONTENT_PREVIEW_KEPT).collect();
        format!("{}...", kept)
    } else {
        content.to_string()
    }
}
