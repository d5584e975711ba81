//! The live aggregation engine.
//!
//! [`Dashboard`] subscribes to the collections a user's dashboard needs
//! and keeps four derived views current: cross-lane progress, the merged
//! activity feed, the notification index, and the check-in streak. Every
//! delivery from a source replaces that source's input slot and
//! synchronously recomputes the affected view. A failed source degrades
//! its slot to empty instead of wedging the view, and still counts as
//! delivered so loading can finish. Dropping the dashboard cancels every
//! subscription.

pub mod feed;
pub mod notifications;
pub mod progress;
pub mod streak;

use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{FailSoft, HarborError, Result};
use crate::model::records::{
    Achievement, AppNotification, Goal, JournalEntry, Post, StepProgress, UserProfile,
    WellnessCheckIn,
};
use crate::model::Lane;
use crate::session::SessionProvider;
use crate::source::{
    decode, CollectionQuery, LiveSource, RecordWriter, SourceEvent, SourceObserver, Subscription,
};

pub use feed::{ActivityItem, ActivityKind, FEED_LIMIT};
pub use notifications::{LaneNotifications, MarkOutcome, NotificationIndex};
pub use progress::{CrossLaneProgress, LaneProgress, RecentAchievement, StepLink};
pub use streak::DayAnchor;

/// A derived value paired with whether its inputs are still loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// The current derived value.
    pub value: T,
    /// True until every input source has delivered at least once.
    pub loading: bool,
}

impl<T> Snapshot<T> {
    /// A snapshot whose inputs have not all arrived yet.
    pub fn loading(value: T) -> Self {
        Snapshot {
            value,
            loading: true,
        }
    }

    /// A snapshot with every input accounted for.
    pub fn settled(value: T) -> Self {
        Snapshot {
            value,
            loading: false,
        }
    }
}

type CellObserver<T> = Arc<dyn Fn(&Snapshot<T>) + Send + Sync>;

/// A push-updated derived value.
///
/// [`get`] reads the current snapshot; [`observe`] registers a callback
/// that fires immediately with the current snapshot and again after every
/// recomputation. Cloning a cell shares the underlying state, so a cell
/// stays readable even after the dashboard that feeds it is gone.
///
/// [`get`]: DerivedCell::get
/// [`observe`]: DerivedCell::observe
pub struct DerivedCell<T> {
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    current: RwLock<Snapshot<T>>,
    observers: RwLock<Vec<CellObserver<T>>>,
}

impl<T: Clone> DerivedCell<T> {
    fn new(initial: Snapshot<T>) -> Self {
        DerivedCell {
            inner: Arc::new(CellInner {
                current: RwLock::new(initial),
                observers: RwLock::new(Vec::new()),
            }),
        }
    }

    /// The current snapshot.
    pub fn get(&self) -> Snapshot<T> {
        self.inner.current.read().unwrap().clone()
    }

    /// Register an observer.
    ///
    /// It fires once immediately with the current snapshot and after every
    /// subsequent update, on whichever thread delivered the update.
    pub fn observe(&self, observer: impl Fn(&Snapshot<T>) + Send + Sync + 'static) {
        let observer: CellObserver<T> = Arc::new(observer);
        self.inner
            .observers
            .write()
            .unwrap()
            .push(Arc::clone(&observer));
        let current = self.get();
        observer(&current);
    }

    fn store(&self, snapshot: Snapshot<T>) {
        *self.inner.current.write().unwrap() = snapshot;
    }

    /// Notify observers with the freshest snapshot. Kept separate from
    /// [`store`] so no lock is held while observers run.
    ///
    /// [`store`]: DerivedCell::store
    fn notify_current(&self) {
        let observers: Vec<CellObserver<T>> = self.inner.observers.read().unwrap().clone();
        if observers.is_empty() {
            return;
        }
        let current = self.get();
        for observer in observers {
            observer(&current);
        }
    }
}

impl<T> Clone for DerivedCell<T> {
    fn clone(&self) -> Self {
        DerivedCell {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for DerivedCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedCell")
            .field("loading", &self.inner.current.read().unwrap().loading)
            .finish()
    }
}

/// One source's contribution to a view.
struct InputSlot<T> {
    records: Vec<T>,
    delivered: bool,
}

impl<T> InputSlot<T> {
    fn deliver(&mut self, records: Vec<T>) {
        self.records = records;
        self.delivered = true;
    }
}

impl<T> Default for InputSlot<T> {
    fn default() -> Self {
        InputSlot {
            records: Vec::new(),
            delivered: false,
        }
    }
}

/// Decode a source event into typed records.
///
/// A failure event degrades to an empty list after logging; the slot still
/// counts as delivered so the view can settle.
fn decoded_records<T>(
    collection: &str,
    event: SourceEvent,
    decode_one: impl Fn(&Value) -> Option<T>,
) -> Vec<T> {
    match event {
        SourceEvent::Snapshot(docs) => decode::decode_all(collection, &docs, decode_one),
        SourceEvent::Failed(message) => {
            let failed: Result<Vec<T>> = Err(HarborError::source(collection, message));
            failed.fail_soft_default(&format!("loading '{}'", collection))
        }
    }
}

/// Box an observer that decodes each event, keeps the records passing
/// `retain`, and hands them on.
fn slot_observer<T: 'static>(
    collection: &str,
    decode_one: impl Fn(&Value) -> Option<T> + Send + Sync + 'static,
    retain: impl Fn(&T) -> bool + Send + Sync + 'static,
    apply: impl Fn(Vec<T>) + Send + Sync + 'static,
) -> SourceObserver {
    let collection = collection.to_string();
    Box::new(move |event| {
        let mut records = decoded_records(&collection, event, &decode_one);
        records.retain(&retain);
        apply(records);
        tracing::debug!("recomputed after '{}' delivery", collection);
    })
}

/// Slot predicate keeping only the signed-in user's records.
///
/// Sources are asked to filter by owner but a degraded backend may deliver
/// an unfiltered superset, so every slot drops foreign-owned records after
/// decode unless the host vouches for its backend via
/// `trust_source_constraints`.
fn owned_by<T: 'static>(
    trust: bool,
    user_id: &str,
    owner_of: impl Fn(&T) -> &str + Send + Sync + 'static,
) -> impl Fn(&T) -> bool + Send + Sync + 'static {
    let user_id = user_id.to_string();
    move |record: &T| trust || owner_of(record) == user_id
}

/// Live derived state for one signed-in user.
///
/// Construction resolves the user once and opens every needed
/// subscription; the four public cells update synchronously as deliveries
/// arrive. With nobody signed in, the cells settle immediately to their
/// neutral values and nothing is subscribed. Dropping the dashboard
/// cancels all subscriptions.
pub struct Dashboard {
    /// Cross-lane progress summary.
    pub progress: DerivedCell<CrossLaneProgress>,
    /// Merged recent activity, newest first.
    pub feed: DerivedCell<Vec<ActivityItem>>,
    /// Notifications grouped by lane.
    pub notifications: DerivedCell<NotificationIndex>,
    /// Consecutive-day check-in streak.
    pub streak: DerivedCell<u32>,
    user_id: Option<String>,
    writer: Arc<dyn RecordWriter>,
    notifications_collection: String,
    notification_records: Arc<Mutex<InputSlot<AppNotification>>>,
    _subscriptions: Vec<Subscription>,
}

impl Dashboard {
    /// Build a dashboard with "today" anchoring the streak.
    pub fn new(
        source: Arc<dyn LiveSource>,
        writer: Arc<dyn RecordWriter>,
        session: &dyn SessionProvider,
        config: &EngineConfig,
    ) -> Self {
        Self::with_anchor(source, writer, session, config, DayAnchor::Today)
    }

    /// Build a dashboard with an explicit streak anchor.
    pub fn with_anchor(
        source: Arc<dyn LiveSource>,
        writer: Arc<dyn RecordWriter>,
        session: &dyn SessionProvider,
        config: &EngineConfig,
        anchor: DayAnchor,
    ) -> Self {
        let notification_records: Arc<Mutex<InputSlot<AppNotification>>> =
            Arc::new(Mutex::new(InputSlot::default()));
        let notifications_collection = config.collections.notifications.clone();

        let Some(user_id) = session.current_user() else {
            tracing::debug!("no signed-in user, dashboard settles to neutral views");
            return Dashboard {
                progress: DerivedCell::new(Snapshot::settled(CrossLaneProgress::default())),
                feed: DerivedCell::new(Snapshot::settled(Vec::new())),
                notifications: DerivedCell::new(Snapshot::settled(NotificationIndex::default())),
                streak: DerivedCell::new(Snapshot::settled(0)),
                user_id: None,
                writer,
                notifications_collection,
                notification_records,
                _subscriptions: Vec::new(),
            };
        };

        let mut subscriptions = Vec::new();
        let progress = wire_progress(&source, &user_id, config, &mut subscriptions);
        let feed = wire_feed(&source, &user_id, config, &mut subscriptions);
        let notifications = wire_notifications(
            &source,
            &user_id,
            config,
            Arc::clone(&notification_records),
            &mut subscriptions,
        );
        let streak = wire_streak(&source, &user_id, config, anchor, &mut subscriptions);

        Dashboard {
            progress,
            feed,
            notifications,
            streak,
            user_id: Some(user_id),
            writer,
            notifications_collection,
            notification_records,
            _subscriptions: subscriptions,
        }
    }

    /// The user this dashboard aggregates for, if anyone is signed in.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Mark a single notification read.
    ///
    /// Succeeds without issuing a write when it is already read; unknown
    /// ids are an error.
    pub fn mark_notification_read(&self, id: &str) -> Result<()> {
        let records = self.notification_records.lock().unwrap().records.clone();
        notifications::mark_as_read(
            self.writer.as_ref(),
            &self.notifications_collection,
            &records,
            id,
        )
    }

    /// Mark every unread notification in a lane read, one write per item.
    pub fn mark_lane_read(&self, lane: Lane) -> Vec<MarkOutcome> {
        let records = self.notification_records.lock().unwrap().records.clone();
        notifications::mark_all_for_lane(
            self.writer.as_ref(),
            &self.notifications_collection,
            &records,
            lane,
        )
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("user_id", &self.user_id)
            .field("subscriptions", &self._subscriptions.len())
            .finish()
    }
}

// ===== View wiring =====

#[derive(Default)]
struct ProgressInputs {
    goals: InputSlot<Goal>,
    steps: InputSlot<StepProgress>,
    achievements: InputSlot<Achievement>,
    profile: InputSlot<UserProfile>,
}

impl ProgressInputs {
    fn snapshot(&self) -> Snapshot<CrossLaneProgress> {
        let current_step = self
            .profile
            .records
            .first()
            .map(|profile| profile.current_step)
            .unwrap_or(1);
        let value = progress::cross_lane_progress(
            &self.goals.records,
            &self.steps.records,
            &self.achievements.records,
            current_step,
        );
        let loading = !(self.goals.delivered
            && self.steps.delivered
            && self.achievements.delivered
            && self.profile.delivered);
        Snapshot { value, loading }
    }
}

fn wire_progress(
    source: &Arc<dyn LiveSource>,
    user_id: &str,
    config: &EngineConfig,
    subscriptions: &mut Vec<Subscription>,
) -> DerivedCell<CrossLaneProgress> {
    let cell = DerivedCell::new(Snapshot::loading(CrossLaneProgress::default()));
    let inputs = Arc::new(Mutex::new(ProgressInputs::default()));
    let trust = config.behavior.trust_source_constraints;

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.goals).where_eq("user_id", user_id),
        slot_observer(
            &config.collections.goals,
            decode::decode_goal,
            owned_by(trust, user_id, |goal: &Goal| &goal.user_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.goals.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.step_progress).where_eq("user_id", user_id),
        slot_observer(
            &config.collections.step_progress,
            decode::decode_step_progress,
            owned_by(trust, user_id, |step: &StepProgress| &step.user_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.steps.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.achievements).where_eq("user_id", user_id),
        slot_observer(
            &config.collections.achievements,
            decode::decode_achievement,
            owned_by(trust, user_id, |a: &Achievement| &a.user_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.achievements.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.users)
            .where_eq("id", user_id)
            .limit(1),
        slot_observer(
            &config.collections.users,
            decode::decode_user,
            owned_by(trust, user_id, |profile: &UserProfile| &profile.id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.profile.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    cell
}

#[derive(Default)]
struct FeedInputs {
    goals: InputSlot<Goal>,
    steps: InputSlot<StepProgress>,
    journals: InputSlot<JournalEntry>,
    achievements: InputSlot<Achievement>,
    posts: InputSlot<Post>,
}

impl FeedInputs {
    fn snapshot(&self) -> Snapshot<Vec<ActivityItem>> {
        let value = feed::merge_feed(
            &self.goals.records,
            &self.steps.records,
            &self.journals.records,
            &self.achievements.records,
            &self.posts.records,
        );
        let loading = !(self.goals.delivered
            && self.steps.delivered
            && self.journals.delivered
            && self.achievements.delivered
            && self.posts.delivered);
        Snapshot { value, loading }
    }
}

fn wire_feed(
    source: &Arc<dyn LiveSource>,
    user_id: &str,
    config: &EngineConfig,
    subscriptions: &mut Vec<Subscription>,
) -> DerivedCell<Vec<ActivityItem>> {
    let cell = DerivedCell::new(Snapshot::loading(Vec::new()));
    let inputs = Arc::new(Mutex::new(FeedInputs::default()));
    let trust = config.behavior.trust_source_constraints;

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.goals).where_eq("user_id", user_id),
        slot_observer(
            &config.collections.goals,
            decode::decode_goal,
            owned_by(trust, user_id, |goal: &Goal| &goal.user_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.goals.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.step_progress).where_eq("user_id", user_id),
        slot_observer(
            &config.collections.step_progress,
            decode::decode_step_progress,
            owned_by(trust, user_id, |step: &StepProgress| &step.user_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.steps.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.journal_entries)
            .where_eq("user_id", user_id)
            .order_by_desc("entry_date"),
        slot_observer(
            &config.collections.journal_entries,
            decode::decode_journal_entry,
            owned_by(trust, user_id, |entry: &JournalEntry| &entry.user_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.journals.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.achievements).where_eq("user_id", user_id),
        slot_observer(
            &config.collections.achievements,
            decode::decode_achievement,
            owned_by(trust, user_id, |a: &Achievement| &a.user_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.achievements.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.posts)
            .where_eq("author_id", user_id)
            .order_by_desc("created_at"),
        slot_observer(
            &config.collections.posts,
            decode::decode_post,
            owned_by(trust, user_id, |post: &Post| &post.author_id),
            {
                let cell = cell.clone();
                let inputs = Arc::clone(&inputs);
                move |records| {
                    let snapshot = {
                        let mut slots = inputs.lock().unwrap();
                        slots.posts.deliver(records);
                        slots.snapshot()
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    cell
}

fn wire_notifications(
    source: &Arc<dyn LiveSource>,
    user_id: &str,
    config: &EngineConfig,
    slot: Arc<Mutex<InputSlot<AppNotification>>>,
    subscriptions: &mut Vec<Subscription>,
) -> DerivedCell<NotificationIndex> {
    let cell = DerivedCell::new(Snapshot::loading(NotificationIndex::default()));
    let trust = config.behavior.trust_source_constraints;

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.notifications)
            .where_eq("user_id", user_id)
            .order_by_desc("created_at"),
        slot_observer(
            &config.collections.notifications,
            decode::decode_notification,
            owned_by(trust, user_id, |n: &AppNotification| &n.user_id),
            {
                let cell = cell.clone();
                move |mut records: Vec<AppNotification>| {
                    if !trust {
                        notifications::sort_newest_first(&mut records);
                    }
                    let snapshot = {
                        let mut slot = slot.lock().unwrap();
                        slot.deliver(records);
                        Snapshot::settled(NotificationIndex::build(&slot.records))
                    };
                    cell.store(snapshot);
                    cell.notify_current();
                }
            },
        ),
    ));

    cell
}

fn wire_streak(
    source: &Arc<dyn LiveSource>,
    user_id: &str,
    config: &EngineConfig,
    anchor: DayAnchor,
    subscriptions: &mut Vec<Subscription>,
) -> DerivedCell<u32> {
    let cell = DerivedCell::new(Snapshot::loading(0));
    let trust = config.behavior.trust_source_constraints;
    let history_cap = config.limits.checkin_history_days as usize;

    subscriptions.push(source.subscribe(
        CollectionQuery::new(&config.collections.checkins)
            .where_eq("user_id", user_id)
            .order_by_desc("day")
            .limit(history_cap),
        slot_observer(
            &config.collections.checkins,
            decode::decode_checkin,
            owned_by(trust, user_id, |c: &WellnessCheckIn| &c.user_id),
            {
                let cell = cell.clone();
                move |records: Vec<WellnessCheckIn>| {
                    let records = if trust {
                        records
                    } else {
                        streak::clip_history(records, history_cap)
                    };
                    let value = streak::consecutive_day_streak(&records, anchor.resolve());
                    cell.store(Snapshot::settled(value));
                    cell.notify_current();
                }
            },
        ),
    ));

    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::records::{
        AchievementKind, GoalStatus, NotificationKind, PostKind, StepStatus,
    };
    use crate::session::StaticSession;
    use crate::source::MemoryHub;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use serde_json::json;

    fn anchor_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn dashboard_for(hub: &MemoryHub, user: &str) -> Dashboard {
        Dashboard::with_anchor(
            Arc::new(hub.clone()),
            Arc::new(hub.clone()),
            &StaticSession::signed_in(user),
            &EngineConfig::default(),
            DayAnchor::Fixed(anchor_day()),
        )
    }

    fn seed_progress_scenario(hub: &MemoryHub) {
        hub.seed_records(
            "goals",
            &[
                Goal::new("g1", "u1", "Find housing").with_status(GoalStatus::Completed),
                Goal::new("g2", "u1", "Get a job"),
                Goal::new("g3", "u1", "Save money"),
                Goal::new("g4", "u1", "Step 2 reflection").with_progress(40),
            ],
        )
        .unwrap();
        hub.seed_records(
            "step_progress",
            &[
                StepProgress::new("s1", "u1", "step-1").with_completed_at(at(9)),
                StepProgress::new("s2", "u1", "step-2").with_completed_at(at(10)),
            ],
        )
        .unwrap();
        hub.seed_records(
            "achievements",
            &[
                Achievement::new("a1", "u1", AchievementKind::Community, "Helper")
                    .with_earned_at(at(8)),
                Achievement::new("a2", "u1", AchievementKind::Community, "Welcomer")
                    .with_earned_at(at(7)),
            ],
        )
        .unwrap();
        hub.seed_records("users", &[UserProfile::new("u1", "Dana")])
            .unwrap();
    }

    // Cells

    #[test]
    fn test_cell_observe_fires_immediately_then_on_update() {
        let cell = DerivedCell::new(Snapshot::loading(1u32));
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        cell.observe(move |snapshot| sink.lock().unwrap().push(snapshot.value));

        cell.store(Snapshot::settled(2));
        cell.notify_current();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert!(!cell.get().loading);
    }

    #[test]
    fn test_cell_clone_shares_state() {
        let cell = DerivedCell::new(Snapshot::loading(0u32));
        let clone = cell.clone();
        cell.store(Snapshot::settled(7));
        assert_eq!(clone.get().value, 7);
    }

    // Signed-out

    #[test]
    fn test_signed_out_settles_neutral_without_subscribing() {
        let hub = MemoryHub::new();
        let dashboard = Dashboard::new(
            Arc::new(hub.clone()),
            Arc::new(hub.clone()),
            &StaticSession::signed_out(),
            &EngineConfig::default(),
        );

        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(dashboard.user_id(), None);

        let progress = dashboard.progress.get();
        assert!(!progress.loading);
        assert_eq!(progress.value, CrossLaneProgress::default());

        assert!(!dashboard.feed.get().loading);
        assert!(dashboard.feed.get().value.is_empty());
        assert_eq!(dashboard.notifications.get().value.total_unread, 0);
        assert_eq!(dashboard.streak.get().value, 0);
    }

    // Loading

    #[test]
    fn test_view_loads_until_every_source_delivers() {
        let hub = MemoryHub::new();
        hub.hold_collection("users");

        let dashboard = dashboard_for(&hub, "u1");

        // Progress still waits on the held profile; the feed does not use
        // it and has settled with empty sources.
        assert!(dashboard.progress.get().loading);
        assert!(!dashboard.feed.get().loading);
        assert!(!dashboard.streak.get().loading);

        hub.release_collection("users");
        assert!(!dashboard.progress.get().loading);
    }

    // Progress

    #[test]
    fn test_progress_scenario_and_reactive_update() {
        let hub = MemoryHub::new();
        seed_progress_scenario(&hub);

        let dashboard = dashboard_for(&hub, "u1");

        let progress = dashboard.progress.get();
        assert!(!progress.loading);
        assert_eq!(progress.value.life_tools.percentage, 25);
        assert_eq!(progress.value.curriculum.percentage, 17);
        assert_eq!(progress.value.community.percentage, 40);
        assert_eq!(progress.value.overall, 27);
        assert!(progress.value.step_links[0].completed);
        assert_eq!(
            progress.value.step_links[1].goal_id.as_deref(),
            Some("g4"),
            "personal goal titled for step 2 links to the table"
        );

        // Completing a second goal pushes life-tools to 50 and the overall
        // to round(107 / 3) = 36.
        hub.insert_record(
            "goals",
            &Goal::new("g2", "u1", "Get a job").with_status(GoalStatus::Completed),
        )
        .unwrap();

        let progress = dashboard.progress.get();
        assert_eq!(progress.value.life_tools.percentage, 50);
        assert_eq!(progress.value.overall, 36);
    }

    #[test]
    fn test_progress_ignores_other_users_records() {
        let hub = MemoryHub::new();
        seed_progress_scenario(&hub);
        hub.insert_record(
            "goals",
            &Goal::new("gx", "u2", "someone else").with_status(GoalStatus::Completed),
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");
        assert_eq!(dashboard.progress.get().value.life_tools.total_items, 4);
    }

    #[test]
    fn test_malformed_records_are_skipped_not_fatal() {
        let hub = MemoryHub::new();
        hub.seed(
            "goals",
            vec![
                json!({"id": "g1", "user_id": "u1", "title": "ok", "status": "completed"}),
                json!({"user_id": "u1", "title": "no id"}),
                json!(17),
            ],
        );

        let dashboard = dashboard_for(&hub, "u1");
        let lane = dashboard.progress.get().value.life_tools;
        assert_eq!(lane.total_items, 1);
        assert_eq!(lane.percentage, 100);
    }

    // Source distrust

    #[test]
    fn test_unfiltered_source_stays_scoped_to_signed_in_user() {
        let hub = MemoryHub::unfiltered();
        hub.seed_records(
            "goals",
            &[
                Goal::new("g1", "u1", "Find housing"),
                Goal::new("g2", "u2", "Other goal").with_status(GoalStatus::Completed),
                Goal::new("g3", "u2", "Another goal").with_status(GoalStatus::Completed),
            ],
        )
        .unwrap();
        hub.seed_records(
            "notifications",
            &[AppNotification::new(
                "n1",
                "u2",
                NotificationKind::Community,
                "Not yours",
            )],
        )
        .unwrap();
        hub.seed_records(
            "checkins",
            &[WellnessCheckIn::new("c1", "u2", anchor_day())],
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");

        // Every view drops the foreign-owned records the source leaked.
        let progress = dashboard.progress.get().value;
        assert_eq!(progress.life_tools.total_items, 1);
        assert_eq!(progress.life_tools.percentage, 0);
        let feed = dashboard.feed.get().value;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, "goal-g1");
        assert_eq!(dashboard.notifications.get().value.total_unread, 0);
        assert_eq!(dashboard.streak.get().value, 0);
    }

    #[test]
    fn test_trusted_source_is_taken_at_its_word() {
        let hub = MemoryHub::unfiltered();
        hub.seed_records(
            "goals",
            &[
                Goal::new("g1", "u1", "Find housing"),
                Goal::new("g2", "u2", "Other goal"),
            ],
        )
        .unwrap();

        let mut config = EngineConfig::default();
        config.behavior.trust_source_constraints = true;
        let dashboard = Dashboard::with_anchor(
            Arc::new(hub.clone()),
            Arc::new(hub.clone()),
            &StaticSession::signed_in("u1"),
            &config,
            DayAnchor::Fixed(anchor_day()),
        );

        assert_eq!(dashboard.progress.get().value.life_tools.total_items, 2);
    }

    // Feed

    #[test]
    fn test_feed_merges_and_updates() {
        let hub = MemoryHub::new();
        hub.seed_records(
            "goals",
            &[Goal::new("g1", "u1", "Find housing")
                .with_status(GoalStatus::Completed)
                .with_updated_at(at(9))],
        )
        .unwrap();
        hub.seed_records(
            "posts",
            &[Post::new("p1", "u1", "Grateful today")
                .with_kind(PostKind::Story)
                .with_created_at(at(11))],
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");

        let feed = dashboard.feed.get();
        assert!(!feed.loading);
        let ids: Vec<&str> = feed.value.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["post-p1", "goal-g1"]);
        assert_eq!(feed.value[0].kind, ActivityKind::StoryShared);

        hub.insert_record(
            "journal_entries",
            &JournalEntry::new("j1", "u1", "calm")
                .with_related_step(3)
                .with_entry_date(at(12)),
        )
        .unwrap();

        let feed = dashboard.feed.get();
        assert_eq!(feed.value[0].id, "journal-j1");
        assert_eq!(feed.value[0].description, "Reflection for Step 3");
    }

    #[test]
    fn test_feed_skips_uncompleted_steps() {
        let hub = MemoryHub::new();
        hub.seed_records(
            "step_progress",
            &[
                StepProgress::new("s1", "u1", "step-1").with_status(StepStatus::InProgress),
                StepProgress::new("s2", "u1", "step-2").with_completed_at(at(10)),
            ],
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");
        let feed = dashboard.feed.get();
        assert_eq!(feed.value.len(), 1);
        assert_eq!(feed.value[0].id, "step-s2");
    }

    // Notifications

    #[test]
    fn test_notifications_index_marking_flows_back() {
        let hub = MemoryHub::new();
        hub.seed_records(
            "notifications",
            &[
                AppNotification::new("n1", "u1", NotificationKind::Community, "Welcome")
                    .with_created_at(at(9)),
                AppNotification::new("n2", "u1", NotificationKind::Community, "Reply")
                    .with_created_at(at(10)),
                AppNotification::new("n3", "u1", NotificationKind::System, "Update")
                    .with_read(true)
                    .with_created_at(at(8)),
            ],
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");

        let index = dashboard.notifications.get().value;
        assert_eq!(index.total_unread, 2);
        assert_eq!(index.community.unread, 2);
        assert_eq!(index.community.items[0].id, "n2", "newest first");

        // Marking one read writes through and the index recomputes.
        dashboard.mark_notification_read("n1").unwrap();
        let index = dashboard.notifications.get().value;
        assert_eq!(index.total_unread, 1);

        // Marking it again is a silent success.
        dashboard.mark_notification_read("n1").unwrap();

        // Unknown ids are rejected.
        assert!(dashboard.mark_notification_read("ghost").is_err());
    }

    #[test]
    fn test_mark_lane_read_full_flow() {
        let hub = MemoryHub::new();
        hub.seed_records(
            "notifications",
            &[
                AppNotification::new("n1", "u1", NotificationKind::Community, "A"),
                AppNotification::new("n2", "u1", NotificationKind::Message, "B"),
                AppNotification::new("n3", "u1", NotificationKind::System, "C"),
            ],
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");

        let outcomes = dashboard.mark_lane_read(Lane::Community);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));

        let index = dashboard.notifications.get().value;
        assert_eq!(index.community.unread, 0);
        assert_eq!(index.life_tools.unread, 1, "system stays untouched");

        // Everything in the lane is read now, so a second pass is empty.
        assert!(dashboard.mark_lane_read(Lane::Community).is_empty());
    }

    #[test]
    fn test_mark_lane_read_partial_failure_marks_the_rest() {
        let hub = MemoryHub::new();
        hub.seed_records(
            "notifications",
            &[
                AppNotification::new("n1", "u1", NotificationKind::Community, "A"),
                AppNotification::new("n2", "u1", NotificationKind::Community, "B"),
            ],
        )
        .unwrap();
        hub.reject_writes_for("n1");

        let dashboard = dashboard_for(&hub, "u1");
        let outcomes = dashboard.mark_lane_read(Lane::Community);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
        assert_eq!(dashboard.notifications.get().value.community.unread, 1);
    }

    // Streak

    #[test]
    fn test_streak_reacts_to_new_checkins() {
        let hub = MemoryHub::new();
        hub.seed_records(
            "checkins",
            &[WellnessCheckIn::new(
                "c1",
                "u1",
                anchor_day() - Duration::days(1),
            )],
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");
        assert_eq!(dashboard.streak.get().value, 1);

        hub.insert_record("checkins", &WellnessCheckIn::new("c2", "u1", anchor_day()))
            .unwrap();
        assert_eq!(dashboard.streak.get().value, 2);

        // A check-in far in the past does not extend the current run.
        hub.insert_record(
            "checkins",
            &WellnessCheckIn::new("c3", "u1", anchor_day() - Duration::days(9)),
        )
        .unwrap();
        assert_eq!(dashboard.streak.get().value, 2);
    }

    // Degradation

    #[test]
    fn test_failed_source_degrades_its_slot_and_settles() {
        let hub = MemoryHub::new();
        seed_progress_scenario(&hub);
        hub.fail_collection("goals", "backend offline");

        let dashboard = dashboard_for(&hub, "u1");

        // The failed slot counts as delivered, so the view settles with an
        // empty life-tools lane while the other lanes survive.
        let progress = dashboard.progress.get();
        assert!(!progress.loading);
        assert_eq!(progress.value.life_tools.total_items, 0);
        assert_eq!(progress.value.curriculum.percentage, 17);

        hub.heal_collection("goals");
        let progress = dashboard.progress.get();
        assert_eq!(progress.value.life_tools.total_items, 4);
    }

    #[test]
    fn test_mid_session_failure_keeps_other_views() {
        let hub = MemoryHub::new();
        hub.seed_records(
            "notifications",
            &[AppNotification::new(
                "n1",
                "u1",
                NotificationKind::Community,
                "A",
            )],
        )
        .unwrap();

        let dashboard = dashboard_for(&hub, "u1");
        assert_eq!(dashboard.notifications.get().value.total_unread, 1);

        hub.fail_collection("notifications", "quota exceeded");
        assert_eq!(
            dashboard.notifications.get().value.total_unread,
            0,
            "failed slot degrades to empty"
        );
        assert!(!dashboard.notifications.get().loading);
        assert!(!dashboard.feed.get().loading, "other views unaffected");
    }

    // Teardown

    #[test]
    fn test_drop_cancels_every_subscription() {
        let hub = MemoryHub::new();
        seed_progress_scenario(&hub);

        let dashboard = dashboard_for(&hub, "u1");
        assert_eq!(hub.subscriber_count(), 11);

        let progress = dashboard.progress.clone();
        let before = progress.get().value;
        drop(dashboard);
        assert_eq!(hub.subscriber_count(), 0);

        // Later mutations no longer reach the cell.
        hub.insert_record(
            "goals",
            &Goal::new("g9", "u1", "late goal").with_status(GoalStatus::Completed),
        )
        .unwrap();
        assert_eq!(progress.get().value, before);
    }
}
