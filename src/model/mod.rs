//! Typed record shapes, lane taxonomy, and timestamp normalization.
//!
//! Everything the engine aggregates is decoded into these closed shapes at
//! the source boundary; aggregation logic pattern-matches instead of probing
//! loosely-typed documents.

pub mod lane;
pub mod records;
pub mod time;

pub use lane::{classify_achievement, classify_notification, Lane};
pub use records::{
    Achievement, AchievementKind, AppNotification, Goal, GoalCategory, GoalStatus, JournalEntry,
    NotificationKind, Post, PostKind, StepProgress, StepStatus, UserProfile, WellnessCheckIn,
};
