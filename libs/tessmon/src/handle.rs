// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Exclusive ownership of a native monitor pointer plus disposal tracking.

use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::error::{MonitorError, Result};
use crate::native::{EtextDesc, RawMonitor};

/// Owns one native monitor pointer.
///
/// The pointer can be taken out exactly once for deletion; afterwards the
/// handle reads as null. Disposal is tracked separately so a disposed handle
/// can still hold its pointer while a deferred delete is pending.
#[derive(Debug)]
pub(crate) struct NativeHandle {
    raw: AtomicPtr<EtextDesc>,
    disposed: AtomicBool,
}

impl NativeHandle {
    pub fn new(raw: RawMonitor) -> Self {
        Self {
            raw: AtomicPtr::new(raw),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn verify_not_disposed(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(MonitorError::Disposed);
        }
        Ok(())
    }

    /// True while the native object exists, regardless of disposal.
    pub fn is_allocated(&self) -> bool {
        !self.raw.load(Ordering::Acquire).is_null()
    }

    /// The pointer, if the handle is neither disposed nor null.
    pub fn live(&self) -> Option<RawMonitor> {
        if self.is_disposed() {
            return None;
        }
        let raw = self.raw.load(Ordering::Acquire);
        (!raw.is_null()).then_some(raw)
    }

    /// Flip to disposed. Returns `false` if it already was.
    pub fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    /// Take the pointer for deletion, leaving null behind.
    pub fn take(&self) -> Option<RawMonitor> {
        let raw = self.raw.swap(std::ptr::null_mut(), Ordering::AcqRel);
        (!raw.is_null()).then_some(raw)
    }
}
