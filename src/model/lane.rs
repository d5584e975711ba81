//! Lane taxonomy and record classification.
//!
//! Three lanes partition the app: case-management/life-tools, the structured
//! curriculum, and the community layer. Classification is a pair of total
//! lookup tables over record discriminants. Unknown tags land in LifeTools so
//! a backend schema addition shows up somewhere instead of vanishing from
//! every aggregation.

use serde::{Deserialize, Serialize};

use crate::model::records::{AchievementKind, NotificationKind};

/// The three functional lanes of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Case management and life tools: goals, appointments, jobs.
    #[default]
    LifeTools,
    /// The structured twelve-step curriculum tracker.
    Curriculum,
    /// The community and peer support layer.
    Community,
}

impl Lane {
    /// All lanes in canonical display order.
    pub const ALL: [Lane; 3] = [Lane::LifeTools, Lane::Curriculum, Lane::Community];

    /// Stable machine-readable tag for this lane.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::LifeTools => "life_tools",
            Lane::Curriculum => "curriculum",
            Lane::Community => "community",
        }
    }

    /// Human-readable label for this lane.
    pub fn label(&self) -> &'static str {
        match self {
            Lane::LifeTools => "Life Tools",
            Lane::Curriculum => "Curriculum",
            Lane::Community => "Community",
        }
    }

    /// Parse a lane tag. Unknown tags resolve to `None`.
    pub fn parse(tag: &str) -> Option<Lane> {
        match tag {
            "life_tools" => Some(Lane::LifeTools),
            "curriculum" => Some(Lane::Curriculum),
            "community" => Some(Lane::Community),
            _ => None,
        }
    }
}

/// Classify an achievement discriminant into its owning lane.
pub fn classify_achievement(kind: &AchievementKind) -> Lane {
    match kind {
        AchievementKind::SobrietyMilestone
        | AchievementKind::Employment
        | AchievementKind::Housing
        | AchievementKind::Financial => Lane::LifeTools,
        AchievementKind::StepCompletion
        | AchievementKind::CourseCompletion
        | AchievementKind::Streak => Lane::Curriculum,
        AchievementKind::Community => Lane::Community,
        AchievementKind::Other(_) => Lane::LifeTools,
    }
}

/// Classify a notification discriminant into its owning lane.
pub fn classify_notification(kind: &NotificationKind) -> Lane {
    match kind {
        NotificationKind::AppointmentReminder
        | NotificationKind::JobMatch
        | NotificationKind::System => Lane::LifeTools,
        NotificationKind::Milestone | NotificationKind::Achievement => Lane::Curriculum,
        NotificationKind::Community | NotificationKind::Message => Lane::Community,
        NotificationKind::Other(_) => Lane::LifeTools,
    }
}
