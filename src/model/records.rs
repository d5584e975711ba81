//! Typed record shapes for the collections the engine aggregates.
//!
//! These are the closed shapes produced by the decode boundary. Discriminant
//! enums keep an `Other` catch-all that preserves the raw tag, so a backend
//! schema addition flows through classification instead of dropping records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::lane::Lane;

/// A case-management goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    /// Record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Goal title as entered by the user or case manager.
    pub title: String,
    /// Goal category.
    pub category: GoalCategory,
    /// Goal status.
    pub status: GoalStatus,
    /// Completion progress in percent, clamped to 0..=100.
    pub progress: u32,
    /// When the goal last changed.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Goal {
    /// Create an active personal goal with zero progress.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            category: GoalCategory::Personal,
            status: GoalStatus::Active,
            progress: 0,
            updated_at: None,
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: GoalCategory) -> Self {
        self.category = category;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: GoalStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the progress percentage (clamped to 100).
    pub fn with_progress(mut self, progress: u32) -> Self {
        self.progress = progress.min(100);
        self
    }

    /// Set the last-updated instant.
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Whether the goal counts as completed.
    pub fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }
}

/// Goal category discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Sobriety,
    Employment,
    Housing,
    Education,
    Health,
    Financial,
    Legal,
    Personal,
    /// Unrecognized category tag, preserved as-is.
    #[serde(untagged)]
    Other(String),
}

impl GoalCategory {
    /// Parse a raw tag; unknown tags are preserved.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "sobriety" => Self::Sobriety,
            "employment" => Self::Employment,
            "housing" => Self::Housing,
            "education" => Self::Education,
            "health" => Self::Health,
            "financial" => Self::Financial,
            "legal" => Self::Legal,
            "personal" => Self::Personal,
            other => Self::Other(other.to_string()),
        }
    }

    /// Stable machine-readable tag.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Sobriety => "sobriety",
            Self::Employment => "employment",
            Self::Housing => "housing",
            Self::Education => "education",
            Self::Health => "health",
            Self::Financial => "financial",
            Self::Legal => "legal",
            Self::Personal => "personal",
            Self::Other(raw) => raw,
        }
    }
}

/// Goal status discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    /// Unrecognized status tag, preserved as-is.
    #[serde(untagged)]
    Other(String),
}

impl GoalStatus {
    /// Parse a raw tag; unknown tags are preserved.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "active" => Self::Active,
            "completed" => Self::Completed,
            "paused" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }

    /// Stable machine-readable tag.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Other(raw) => raw,
        }
    }
}

/// A curriculum step completion record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepProgress {
    /// Record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Course/step identifier, e.g. `"step-4"`.
    pub course_id: String,
    /// Progress status.
    pub status: StepStatus,
    /// When the step was completed, if it was.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: Option<DateTime<Utc>>,
}

impl StepProgress {
    /// Create a not-started progress record.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        course_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            course_id: course_id.into(),
            status: StepStatus::NotStarted,
            completed_at: None,
            created_at: None,
        }
    }

    /// Set the status.
    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    /// Mark completed at the given instant.
    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.status = StepStatus::Completed;
        self.completed_at = Some(at);
        self
    }

    /// Set the creation instant.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Whether the step counts as completed.
    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Resolve the course identifier to a curriculum step number.
    ///
    /// The trailing integer of the identifier is the step number: `"7"`,
    /// `"step-7"`, `"step_7"`, and `"step 7"` all resolve to 7. Identifiers
    /// without a trailing integer resolve to no step.
    pub fn step_number(&self) -> Option<u32> {
        let trailing: Vec<char> = self
            .course_id
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if trailing.is_empty() {
            return None;
        }
        trailing.iter().rev().collect::<String>().parse().ok()
    }
}

/// Step status discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    InProgress,
    Completed,
    /// Unrecognized status tag, preserved as-is.
    #[serde(untagged)]
    Other(String),
}

impl StepStatus {
    /// Parse a raw tag; unknown tags are preserved.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "not_started" => Self::NotStarted,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Stable machine-readable tag.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Other(raw) => raw,
        }
    }
}

/// A journal entry written during curriculum work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    /// Record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// When the entry was written.
    pub entry_date: Option<DateTime<Utc>>,
    /// Mood label chosen by the user.
    pub mood: String,
    /// Curriculum step the entry reflects on, if any.
    pub related_step: Option<u32>,
}

impl JournalEntry {
    /// Create a journal entry with the given mood.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, mood: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            entry_date: None,
            mood: mood.into(),
            related_step: None,
        }
    }

    /// Set the entry instant.
    pub fn with_entry_date(mut self, at: DateTime<Utc>) -> Self {
        self.entry_date = Some(at);
        self
    }

    /// Link the entry to a curriculum step.
    pub fn with_related_step(mut self, step: u32) -> Self {
        self.related_step = Some(step);
        self
    }
}

/// An earned achievement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Achievement {
    /// Record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Achievement discriminant, drives lane classification.
    pub kind: AchievementKind,
    /// Display title.
    pub title: String,
    /// When the achievement was earned.
    pub earned_at: Option<DateTime<Utc>>,
}

impl Achievement {
    /// Create an achievement.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        kind: AchievementKind,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            kind,
            title: title.into(),
            earned_at: None,
        }
    }

    /// Set the earned instant.
    pub fn with_earned_at(mut self, at: DateTime<Utc>) -> Self {
        self.earned_at = Some(at);
        self
    }
}

/// Achievement discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    SobrietyMilestone,
    Employment,
    Housing,
    Financial,
    StepCompletion,
    CourseCompletion,
    Streak,
    Community,
    /// Unrecognized achievement tag, preserved as-is.
    #[serde(untagged)]
    Other(String),
}

impl AchievementKind {
    /// Parse a raw tag; unknown tags are preserved.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "sobriety_milestone" => Self::SobrietyMilestone,
            "employment" => Self::Employment,
            "housing" => Self::Housing,
            "financial" => Self::Financial,
            "step_completion" => Self::StepCompletion,
            "course_completion" => Self::CourseCompletion,
            "streak" => Self::Streak,
            "community" => Self::Community,
            other => Self::Other(other.to_string()),
        }
    }

    /// Stable machine-readable tag.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::SobrietyMilestone => "sobriety_milestone",
            Self::Employment => "employment",
            Self::Housing => "housing",
            Self::Financial => "financial",
            Self::StepCompletion => "step_completion",
            Self::CourseCompletion => "course_completion",
            Self::Streak => "streak",
            Self::Community => "community",
            Self::Other(raw) => raw,
        }
    }
}

/// A community post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Record identifier.
    pub id: String,
    /// Author user id.
    pub author_id: String,
    /// Post discriminant.
    pub kind: PostKind,
    /// Post body content.
    pub content: String,
    /// When the post was created.
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Create a text post.
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            kind: PostKind::Text,
            content: content.into(),
            created_at: None,
        }
    }

    /// Set the post kind.
    pub fn with_kind(mut self, kind: PostKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the creation instant.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Post discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Text,
    Image,
    Video,
    Story,
    Milestone,
    ResourceShare,
    /// Unrecognized post tag, preserved as-is.
    #[serde(untagged)]
    Other(String),
}

impl PostKind {
    /// Parse a raw tag; unknown tags are preserved.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "image" => Self::Image,
            "video" => Self::Video,
            "story" => Self::Story,
            "milestone" => Self::Milestone,
            "resource_share" => Self::ResourceShare,
            other => Self::Other(other.to_string()),
        }
    }

    /// Stable machine-readable tag.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Story => "story",
            Self::Milestone => "milestone",
            Self::ResourceShare => "resource_share",
            Self::Other(raw) => raw,
        }
    }
}

/// An in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppNotification {
    /// Record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Notification discriminant, drives lane classification.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Whether the user has read it.
    pub read: bool,
    /// When the notification was created.
    pub created_at: Option<DateTime<Utc>>,
}

impl AppNotification {
    /// Create an unread notification.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            kind,
            title: title.into(),
            body: String::new(),
            read: false,
            created_at: None,
        }
    }

    /// Set the body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the read flag.
    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Set the creation instant.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Notification discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentReminder,
    JobMatch,
    System,
    Milestone,
    Achievement,
    Community,
    Message,
    /// Unrecognized notification tag, preserved as-is.
    #[serde(untagged)]
    Other(String),
}

impl NotificationKind {
    /// Parse a raw tag; unknown tags are preserved.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "appointment_reminder" => Self::AppointmentReminder,
            "job_match" => Self::JobMatch,
            "system" => Self::System,
            "milestone" => Self::Milestone,
            "achievement" => Self::Achievement,
            "community" => Self::Community,
            "message" => Self::Message,
            other => Self::Other(other.to_string()),
        }
    }

    /// Stable machine-readable tag.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::AppointmentReminder => "appointment_reminder",
            Self::JobMatch => "job_match",
            Self::System => "system",
            Self::Milestone => "milestone",
            Self::Achievement => "achievement",
            Self::Community => "community",
            Self::Message => "message",
            Self::Other(raw) => raw,
        }
    }
}

/// A daily wellness check-in.
///
/// Only the calendar day feeds the streak calculation; the scores ride along
/// for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellnessCheckIn {
    /// Record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Calendar day of the check-in. `None` when the stored date is malformed.
    pub day: Option<NaiveDate>,
    /// Self-reported mood score.
    pub mood_score: Option<i64>,
    /// Self-reported craving level.
    pub craving_level: Option<i64>,
    /// Self-reported safety rating.
    pub safety_rating: Option<i64>,
}

impl WellnessCheckIn {
    /// Create a check-in for the given day.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            day: Some(day),
            mood_score: None,
            craving_level: None,
            safety_rating: None,
        }
    }

    /// Set the self-reported scores.
    pub fn with_scores(mut self, mood: i64, craving: i64, safety: i64) -> Self {
        self.mood_score = Some(mood);
        self.craving_level = Some(craving);
        self.safety_rating = Some(safety);
        self
    }
}

/// A user profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// User identifier.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Lanes the user participates in.
    pub lanes: Vec<Lane>,
    /// The curriculum step the user is currently working.
    pub current_step: u32,
}

impl UserProfile {
    /// Create a profile starting at step 1 with no lane memberships.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            lanes: Vec::new(),
            current_step: 1,
        }
    }

    /// Set the current curriculum step.
    pub fn with_current_step(mut self, step: u32) -> Self {
        self.current_step = step;
        self
    }

    /// Set the lane memberships.
    pub fn with_lanes(mut self, lanes: Vec<Lane>) -> Self {
        self.lanes = lanes;
        self
    }
}
