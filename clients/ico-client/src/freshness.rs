//! Freshness Guard
//!
//! Request-generation counter for views that refetch on every input
//! change. Each fetch takes a [`Ticket`] before it starts; when the response
//! arrives, only the holder of the newest ticket may apply it.
//!
//! ```text
//! begin() -> #1 ───────────────fetch────────────────► accept(#1) = Superseded
//! begin() -> #2 ──────fetch──────► accept(#2) = Fresh
//! ```
//!
//! Nothing is cancelled: the older request still completes, its result is
//! just dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generation number handed out by [`FreshnessGuard::begin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// A response tagged with whether it may still be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Guarded<T> {
    Fresh(T),
    Superseded,
}

impl<T> Guarded<T> {
    pub fn into_fresh(self) -> Option<T> {
        match self {
            Guarded::Fresh(value) => Some(value),
            Guarded::Superseded => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct FreshnessGuard {
    latest: AtomicU64,
}

impl FreshnessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket.
    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether no newer request has started since `ticket`.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Keep `value` only if `ticket` is still the newest.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Guarded<T> {
        if self.is_current(ticket) {
            Guarded::Fresh(value)
        } else {
            Guarded::Superseded
        }
    }

    /// Invalidate every outstanding ticket, e.g. when the view goes away.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }
}
