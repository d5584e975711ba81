//! Identity resolution for the aggregation engine.
//!
//! The engine never authenticates anyone. It asks a [`SessionProvider`] who
//! the current user is, exactly once per dashboard construction, and treats
//! `None` as "signed out": every derived view settles to its neutral empty
//! value with loading finished, and no subscriptions are opened.

use std::sync::Arc;

/// Source of the currently signed-in user id.
pub trait SessionProvider: Send + Sync {
    /// The signed-in user id, or `None` when signed out.
    fn current_user(&self) -> Option<String>;
}

impl<T: SessionProvider + ?Sized> SessionProvider for Arc<T> {
    fn current_user(&self) -> Option<String> {
        (**self).current_user()
    }
}

impl<T: SessionProvider + ?Sized> SessionProvider for Box<T> {
    fn current_user(&self) -> Option<String> {
        (**self).current_user()
    }
}

/// Fixed session state, the common case for tests and embedded use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSession {
    user_id: Option<String>,
}

impl StaticSession {
    /// A session signed in as the given user.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        StaticSession {
            user_id: Some(user_id.into()),
        }
    }

    /// A session with nobody signed in.
    pub fn signed_out() -> Self {
        StaticSession::default()
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<String> {
        self.user_id.clone()
    }
}
