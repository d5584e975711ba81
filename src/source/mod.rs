//! Live data sources and the decode boundary.
//!
//! A source is anything that can push collection snapshots at the engine:
//! [`LiveSource`] delivers [`SourceEvent`]s for a [`CollectionQuery`] until
//! its [`Subscription`] is dropped, and [`RecordWriter`] applies partial
//! updates back to single records. [`MemoryHub`] is the in-process
//! implementation used by tests and local tooling; [`decode`] turns raw
//! documents into the typed records the engine aggregates.

pub mod decode;
pub mod memory;
pub mod query;
pub mod traits;

pub use memory::MemoryHub;
pub use query::{CollectionQuery, FieldFilter, SortDirection, SortSpec};
pub use traits::{LiveSource, RecordWriter, SourceEvent, SourceObserver, Subscription};
