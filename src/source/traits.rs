//! Live collection source and record writer traits.
//!
//! A [`LiveSource`] is the push-based subscription capability the engine
//! consumes: it delivers a full snapshot of a queried collection at subscribe
//! time and again after every change. A [`RecordWriter`] applies partial
//! updates to single records. Both are object-safe so hosts can hand the
//! engine whatever backend they have.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::source::query::CollectionQuery;

/// One delivery to a subscription observer.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// The full current snapshot of the queried collection.
    Snapshot(Vec<Value>),
    /// The stream failed. The slot counts as delivered; consumers degrade
    /// that input to empty rather than waiting forever.
    Failed(String),
}

/// Callback receiving source events.
pub type SourceObserver = Box<dyn Fn(SourceEvent) + Send + Sync>;

/// Push-based live collection source.
///
/// Implementations deliver the current snapshot synchronously before
/// `subscribe` returns, then re-deliver on every underlying change. They are
/// asked to honor the query's constraints but consumers must not depend on
/// it; delivering an unfiltered superset is degraded-but-legal behavior.
pub trait LiveSource: Send + Sync {
    /// Subscribe an observer to a collection query.
    ///
    /// Dropping the returned guard releases the subscription; no events are
    /// delivered after that.
    fn subscribe(&self, query: CollectionQuery, observer: SourceObserver) -> Subscription;
}

/// Blanket implementation so shared sources can be handed around as `Arc`.
impl<T: LiveSource + ?Sized> LiveSource for Arc<T> {
    fn subscribe(&self, query: CollectionQuery, observer: SourceObserver) -> Subscription {
        (**self).subscribe(query, observer)
    }
}

impl LiveSource for Box<dyn LiveSource> {
    fn subscribe(&self, query: CollectionQuery, observer: SourceObserver) -> Subscription {
        (**self).subscribe(query, observer)
    }
}

/// Partial-update writer for single records.
pub trait RecordWriter: Send + Sync {
    /// Merge a JSON object patch into one record.
    ///
    /// The patch applies to the named record only; it must not touch
    /// siblings. Unknown records and rejected patches surface as errors.
    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;
}

impl<T: RecordWriter + ?Sized> RecordWriter for Arc<T> {
    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        (**self).update(collection, id, patch)
    }
}

impl RecordWriter for Box<dyn RecordWriter> {
    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        (**self).update(collection, id, patch)
    }
}

/// Subscription guard. Unsubscribes when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a guard that runs `cancel` exactly once, on drop or on
    /// [`Subscription::cancel`].
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard with nothing to release.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Whether the subscription is still held.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Release the subscription now instead of at drop.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
