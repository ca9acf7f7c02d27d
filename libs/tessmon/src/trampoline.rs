// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! `extern "C"` entry points the native engine calls during recognition.
//!
//! Both trampolines recover the owning monitor from the context pointer
//! registered at construction, then dispatch to its observers. A panic must
//! never unwind into native frames, so dispatch runs under `catch_unwind`
//! and the trampoline answers with a well-defined value. Progress dispatch
//! also contains each observer on its own.

use std::any::Any;
use std::ffi::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

use crate::monitor::MonitorShared;
use crate::native::{MonitorApi, RawMonitor};

/// Progress callback. Always answers "continue".
pub(crate) extern "C" fn progress_trampoline<A: MonitorApi>(
    ths: RawMonitor,
    left: c_int,
    right: c_int,
    top: c_int,
    bottom: c_int,
) -> bool {
    if ths.is_null() {
        return true;
    }
    let Some(shared) = (unsafe { MonitorShared::<A>::from_context(A::cancel_this(ths)) }) else {
        tracing::trace!("progress callback on a monitor without context");
        return true;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| {
        shared.dispatch_progress(left, right, top, bottom)
    })) {
        Ok(keep_going) => keep_going,
        Err(payload) => {
            tracing::error!(
                "progress observer panicked, continuing recognition: {}",
                panic_message(payload.as_ref())
            );
            true
        }
    }
}

/// Cancellation callback. Answers `true` to stop the native operation.
pub(crate) extern "C" fn cancel_trampoline<A: MonitorApi>(
    cancel_this: *mut c_void,
    words: c_int,
) -> bool {
    let Some(shared) = (unsafe { MonitorShared::<A>::from_context(cancel_this) }) else {
        tracing::trace!("cancel check on a monitor without context");
        return false;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| shared.dispatch_cancel_check(words))) {
        Ok(cancel) => cancel,
        Err(payload) => {
            let cancel = shared.cancel_on_observer_panic();
            tracing::error!(
                cancel,
                "cancel-check observer panicked: {}",
                panic_message(payload.as_ref())
            );
            cancel
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
