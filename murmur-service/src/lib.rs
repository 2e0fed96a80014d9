//! The social actions of murmur: posting, liking, favouriting and following, plus the
//! registration and token checks that identify who performs them.

pub mod auth;
mod error;
pub mod interactions;
pub mod people;
pub mod posts;

pub use error::{FailureKind, Result, SocialError};

use murmur_common::util::PositiveDuration;
use murmur_db::store::Store;
use std::sync::Arc;

/// Stateless between calls; cloning shares the store.
#[derive(Debug)]
pub struct SocialService<S> {
    store: Arc<S>,
    token_lifetime: Option<PositiveDuration>,
}

impl<S> Clone for SocialService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            token_lifetime: self.token_lifetime,
        }
    }
}

impl<S: Store> SocialService<S> {
    /// Tokens issued by this service expire after `token_lifetime`, or never if it is `None`.
    #[must_use]
    pub fn new(store: Arc<S>, token_lifetime: Option<PositiveDuration>) -> Self {
        Self {
            store,
            token_lifetime,
        }
    }
}
