//! Harbor - Cross-lane derived state for a recovery companion
//!
//! Harbor subscribes to a user's live record collections and keeps the
//! derived dashboard views current: cross-lane progress, the merged
//! activity feed, notifications grouped by lane, and the check-in streak.
//! Sources push full snapshots; every delivery recomputes synchronously,
//! and a failing source degrades its slice instead of wedging the view.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod session;
pub mod source;

pub use config::EngineConfig;
pub use engine::{
    ActivityItem, ActivityKind, CrossLaneProgress, Dashboard, DayAnchor, DerivedCell,
    LaneNotifications, LaneProgress, MarkOutcome, NotificationIndex, RecentAchievement, Snapshot,
    StepLink, FEED_LIMIT,
};
pub use error::{FailSoft, HarborError, Result};
pub use model::Lane;
pub use session::{SessionProvider, StaticSession};
pub use source::{
    CollectionQuery, LiveSource, MemoryHub, RecordWriter, SourceEvent, SourceObserver,
    Subscription,
};
