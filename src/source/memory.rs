//! In-memory live source backed by plain JSON documents.
//!
//! `MemoryHub` implements both [`LiveSource`] and [`RecordWriter`] over
//! process-local collections, pushing a fresh snapshot to every matching
//! subscriber whenever a collection changes. Cloning a hub shares the same
//! underlying collections.
//!
//! Beyond plain storage the hub can misbehave on command, which is how the
//! engine's degradation paths get exercised: a collection can be marked
//! failed (subscribers receive [`SourceEvent::Failed`]), held (the initial
//! snapshot is withheld until released), or individual record ids can be
//! made to reject writes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::error::{HarborError, Result};
use crate::source::query::CollectionQuery;
use crate::source::traits::{LiveSource, RecordWriter, SourceEvent, SourceObserver, Subscription};

/// Cheaply cloneable in-memory document hub.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    subscribers: RwLock<HashMap<u64, Arc<SubscriberEntry>>>,
    next_subscriber_id: AtomicU64,
    /// Collections currently delivering failures, with the failure message.
    failed: RwLock<HashMap<String, String>>,
    /// Collections whose snapshots are withheld until released.
    held: RwLock<HashSet<String>>,
    /// Record ids whose writes are rejected.
    rejected_write_ids: RwLock<HashSet<String>>,
    /// When false the hub ignores subscription ordering and limits,
    /// modeling a backend that only honors equality filters.
    ignore_constraints: bool,
    /// When true the hub delivers whole collections, equality filters
    /// included, modeling a backend that drops every query constraint.
    ignore_filters: bool,
}

struct SubscriberEntry {
    query: CollectionQuery,
    observer: SourceObserver,
}

impl MemoryHub {
    /// Create a hub that honors query ordering and limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hub that applies equality filters but ignores ordering and
    /// limits, like a backend that cannot be trusted to sort.
    pub fn ignoring_constraints() -> Self {
        MemoryHub {
            inner: Arc::new(HubInner {
                ignore_constraints: true,
                ..HubInner::default()
            }),
        }
    }

    /// Create a hub that ignores every query constraint, equality filters
    /// included, and delivers whole collections to every subscriber.
    pub fn unfiltered() -> Self {
        MemoryHub {
            inner: Arc::new(HubInner {
                ignore_filters: true,
                ..HubInner::default()
            }),
        }
    }

    /// Replace a collection's contents and notify its subscribers.
    pub fn seed(&self, collection: &str, docs: Vec<Value>) {
        self.inner
            .collections
            .write()
            .unwrap()
            .insert(collection.to_string(), docs);
        self.inner.notify_collection(collection);
    }

    /// Replace a collection's contents from typed records.
    pub fn seed_records<T: Serialize>(&self, collection: &str, records: &[T]) -> Result<()> {
        let docs = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.seed(collection, docs);
        Ok(())
    }

    /// Insert or replace a single document, keyed by its `id` field.
    pub fn insert(&self, collection: &str, doc: Value) {
        {
            let mut collections = self.inner.collections.write().unwrap();
            let docs = collections.entry(collection.to_string()).or_default();
            let id = doc.get("id").and_then(Value::as_str).map(str::to_string);
            match id.and_then(|id| {
                docs.iter()
                    .position(|d| d.get("id").and_then(Value::as_str) == Some(id.as_str()))
            }) {
                Some(position) => docs[position] = doc,
                None => docs.push(doc),
            }
        }
        self.inner.notify_collection(collection);
    }

    /// Insert or replace a single typed record.
    pub fn insert_record<T: Serialize>(&self, collection: &str, record: &T) -> Result<()> {
        self.insert(collection, serde_json::to_value(record)?);
        Ok(())
    }

    /// Remove a document by id, if present.
    pub fn remove(&self, collection: &str, id: &str) {
        let removed = {
            let mut collections = self.inner.collections.write().unwrap();
            match collections.get_mut(collection) {
                Some(docs) => {
                    let before = docs.len();
                    docs.retain(|d| d.get("id").and_then(Value::as_str) != Some(id));
                    docs.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.inner.notify_collection(collection);
        }
    }

    /// Start failing a collection; current and future subscribers receive
    /// [`SourceEvent::Failed`] with the message.
    pub fn fail_collection(&self, collection: &str, message: &str) {
        self.inner
            .failed
            .write()
            .unwrap()
            .insert(collection.to_string(), message.to_string());
        self.inner.notify_collection(collection);
    }

    /// Stop failing a collection and push a fresh snapshot.
    pub fn heal_collection(&self, collection: &str) {
        self.inner.failed.write().unwrap().remove(collection);
        self.inner.notify_collection(collection);
    }

    /// Withhold snapshots for a collection until [`release_collection`]
    /// (subscribers register but receive nothing).
    ///
    /// [`release_collection`]: MemoryHub::release_collection
    pub fn hold_collection(&self, collection: &str) {
        self.inner.held.write().unwrap().insert(collection.to_string());
    }

    /// Release a held collection and push the pending snapshot.
    pub fn release_collection(&self, collection: &str) {
        self.inner.held.write().unwrap().remove(collection);
        self.inner.notify_collection(collection);
    }

    /// Make writes against a specific record id fail.
    pub fn reject_writes_for(&self, id: &str) {
        self.inner
            .rejected_write_ids
            .write()
            .unwrap()
            .insert(id.to_string());
    }

    /// Number of live subscriptions, for teardown assertions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().unwrap().len()
    }
}

impl HubInner {
    fn visible_docs(&self, query: &CollectionQuery) -> Vec<Value> {
        let docs = self
            .collections
            .read()
            .unwrap()
            .get(&query.collection)
            .cloned()
            .unwrap_or_default();
        if self.ignore_filters {
            docs
        } else if self.ignore_constraints {
            docs.into_iter().filter(|doc| query.matches(doc)).collect()
        } else {
            query.apply(docs)
        }
    }

    fn notify_collection(&self, collection: &str) {
        if self.held.read().unwrap().contains(collection) {
            return;
        }
        // Snapshot the subscriber list before invoking observers so a
        // callback may subscribe or mutate without deadlocking.
        let entries: Vec<Arc<SubscriberEntry>> = self
            .subscribers
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.query.collection == collection)
            .cloned()
            .collect();
        if entries.is_empty() {
            return;
        }
        let failure = self.failed.read().unwrap().get(collection).cloned();
        for entry in entries {
            match &failure {
                Some(message) => (entry.observer)(SourceEvent::Failed(message.clone())),
                None => (entry.observer)(SourceEvent::Snapshot(self.visible_docs(&entry.query))),
            }
        }
    }
}

impl LiveSource for MemoryHub {
    fn subscribe(&self, query: CollectionQuery, observer: SourceObserver) -> Subscription {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(SubscriberEntry { query, observer });
        self.inner
            .subscribers
            .write()
            .unwrap()
            .insert(id, Arc::clone(&entry));

        let collection = entry.query.collection.clone();
        let failure = self.inner.failed.read().unwrap().get(&collection).cloned();
        if let Some(message) = failure {
            (entry.observer)(SourceEvent::Failed(message));
        } else if !self.inner.held.read().unwrap().contains(&collection) {
            (entry.observer)(SourceEvent::Snapshot(self.inner.visible_docs(&entry.query)));
        }

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.subscribers.write().unwrap().remove(&id);
            }
        })
    }
}

impl RecordWriter for MemoryHub {
    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        if self.inner.rejected_write_ids.read().unwrap().contains(id) {
            return Err(HarborError::mutation(collection, id, "write rejected"));
        }
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(HarborError::mutation(collection, id, "patch must be an object")),
        };

        {
            let mut collections = self.inner.collections.write().unwrap();
            let docs = collections
                .get_mut(collection)
                .ok_or_else(|| HarborError::unknown_record(collection, id))?;
            let doc = docs
                .iter_mut()
                .find(|d| d.get("id").and_then(Value::as_str) == Some(id))
                .ok_or_else(|| HarborError::unknown_record(collection, id))?;
            if let Value::Object(existing) = doc {
                for (key, value) in patch {
                    existing.insert(key, value);
                }
            }
        }

        self.inner.notify_collection(collection);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.inner.collections.read().unwrap();
        f.debug_struct("MemoryHub")
            .field("collections", &collections.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
