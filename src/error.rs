//! Unified error types for Harbor with fail-soft philosophy.
//!
//! Nothing in the aggregation layer is allowed to take the app down: a broken
//! stream or a malformed record degrades to an empty or default view, logged
//! as a warning. Only mutations (mark-as-read) surface rejections to the
//! caller, and then one item at a time so batch siblings keep going.

use thiserror::Error;

/// The main error type for Harbor operations.
#[derive(Error, Debug)]
pub enum HarborError {
    /// A raw backend document could not be decoded into a typed record.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A live collection stream reported a delivery failure.
    #[error("source error in '{collection}': {message}")]
    Source { collection: String, message: String },

    /// A partial update against one record was rejected by the writer.
    #[error("mutation error on {collection}/{id}: {message}")]
    Mutation {
        collection: String,
        id: String,
        message: String,
    },

    /// A mutation targeted a record that is not in the observed snapshot.
    #[error("unknown record: {collection}/{id}")]
    UnknownRecord { collection: String, id: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for Harbor operations.
pub type Result<T> = std::result::Result<T, HarborError>;

impl HarborError {
    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a source stream error.
    pub fn source(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create a mutation error for one record.
    pub fn mutation(
        collection: impl Into<String>,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Mutation {
            collection: collection.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create an unknown record error.
    pub fn unknown_record(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::UnknownRecord {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check whether this error degrades rather than aborts.
    ///
    /// The worst observable outcome anywhere in the aggregation layer is a
    /// stale or empty derived view. This method returns true for all error
    /// types.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

impl From<serde_json::Error> for HarborError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-soft error handling.
///
/// This trait provides methods for handling errors according to Harbor's
/// fail-soft philosophy: log the error and return a safe default.
pub trait FailSoft<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_soft_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_soft_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailSoft<T> for Result<T> {
    fn fail_soft_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-soft: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_soft_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-soft: using fallback)", context, err);
                fallback
            }
        }
    }
}
