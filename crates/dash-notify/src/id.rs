//! Short Identifier Generation
//!
//! Ids are short random alphanumeric strings. Uniqueness is enforced by
//! re-rolling against the owning store, with a bounded number of attempts.

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{NotifyError, Result};

/// Default id length for subscriptions and registrations
pub const DEFAULT_ID_LENGTH: usize = 5;

/// Default cap on collision re-rolls
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Draw `length` characters uniformly from `[A-Za-z0-9]`.
pub fn generate_id(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Existence check used by the collision loop
#[async_trait]
pub trait IdLookup: Send + Sync {
    async fn exists_by_id(&self, id: &str) -> Result<bool>;
}

/// Bounded allocator of collision-free ids.
///
/// The check-then-insert sequence is not linearizable; two concurrent
/// allocations drawing the same id is an accepted residual risk.
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    length: usize,
    max_attempts: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }
}

impl IdAllocator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self {
            length,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns the first generated id the lookup reports as free.
    ///
    /// A lookup error fails closed and is returned as is.
    pub async fn allocate<L>(&self, lookup: &L) -> Result<String>
    where
        L: IdLookup + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = generate_id(self.length);
            if !lookup.exists_by_id(&candidate).await? {
                return Ok(candidate);
            }
            debug!(attempt, id = %candidate, "Generated id already in use, re-rolling");
        }

        warn!(attempts = self.max_attempts, "Could not allocate a free id");
        Err(NotifyError::ExhaustedAttempts {
            attempts: self.max_attempts,
        })
    }
}
