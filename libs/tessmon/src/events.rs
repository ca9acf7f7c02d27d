// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Event payloads delivered to monitor observers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Progress notification raised while the native engine works through a
/// page. The bounds describe the region currently being recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
    /// Percentage reported by the native monitor at the time of the callback.
    pub progress: i32,
}

/// Cancellation poll raised periodically by the native engine.
///
/// Every observer of one poll sees the same event, so a later observer can
/// overwrite the answer of an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelCheckEvent {
    words: i32,
    progress: i32,
    /// Set to `true` to stop the native operation.
    pub cancel: bool,
}

impl CancelCheckEvent {
    pub fn new(words: i32, progress: i32) -> Self {
        Self {
            words,
            progress,
            cancel: false,
        }
    }

    /// Number of words processed so far.
    pub fn words(&self) -> i32 {
        self.words
    }

    pub fn progress(&self) -> i32 {
        self.progress
    }
}

/// Identifies one subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_check_defaults_to_continue() {
        let event = CancelCheckEvent::new(42, 17);
        assert_eq!(event.words(), 42);
        assert_eq!(event.progress(), 17);
        assert!(!event.cancel);
    }

    #[test]
    fn test_observer_ids_are_unique() {
        let a = ObserverId::next();
        let b = ObserverId::next();
        assert_ne!(a, b);
        assert!(a < b);
    }
}
