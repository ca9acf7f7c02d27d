// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Progress and cancellation monitor for one native recognition.

use std::cell::Cell;
use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::ReentrantMutex;

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::events::{CancelCheckEvent, ObserverId, ProgressEvent};
use crate::handle::NativeHandle;
use crate::native::{CancelFunc, MonitorApi, ProgressFunc, RawMonitor};
use crate::observers::{CancelObserver, ObserverList, ProgressObserver};
use crate::trampoline::{cancel_trampoline, panic_message, progress_trampoline};

/// Relays progress and cancellation callbacks from a native recognition to
/// Rust observers.
///
/// The monitor owns one native monitor object. Open a
/// [`begin_operation`] guard around the long-running native call and pass
/// it the guard's handle; while it runs the engine calls back into the
/// monitor, which notifies observers in subscription order. Native callback
/// pointers are only installed once the first observer of a channel
/// subscribes, so an unobserved recognition never calls back into Rust.
///
/// ```
/// use tessmon::Monitor;
/// use tessmon::native::simulated::{Outcome, SimulatedEngine, WordBox};
///
/// let engine = SimulatedEngine::new();
/// let monitor = Monitor::new(engine.clone());
/// monitor.on_cancel_check(|check| check.cancel = check.words() >= 2)?;
///
/// let words = [WordBox::new(0, 10, 0, 10); 5];
/// let result = engine.recognize_with(&monitor, &words)?;
/// assert_eq!(result.outcome, Outcome::Cancelled);
/// # Ok::<(), tessmon::MonitorError>(())
/// ```
///
/// [`begin_operation`]: Monitor::begin_operation
pub struct Monitor<A: MonitorApi> {
    // Boxed so the context pointer registered with the native object stays
    // valid when the Monitor moves.
    shared: Box<MonitorShared<A>>,
}

/// State reachable from the trampolines through the native context pointer.
pub(crate) struct MonitorShared<A: MonitorApi> {
    api: A,
    config: MonitorConfig,
    handle: NativeHandle,
    /// Serializes native calls and dispatch with disposal. Re-entrant so
    /// observers can call back into the monitor; the cell counts trampoline
    /// dispatches in flight on the holding thread.
    gate: ReentrantMutex<Cell<u32>>,
    /// Native operations running on the handle, on any thread. Changed
    /// under the gate.
    operations: AtomicU32,
    progress_observers: ObserverList<ProgressObserver>,
    cancel_observers: ObserverList<CancelObserver>,
    progress_installed: AtomicBool,
    cancel_installed: AtomicBool,
    on_progress: ProgressFunc,
    on_cancel_check: CancelFunc,
}

impl<A: MonitorApi> Monitor<A> {
    pub fn new(api: A) -> Self {
        Self::with_config(api, MonitorConfig::default())
    }

    pub fn with_config(api: A, config: MonitorConfig) -> Self {
        let raw = api.create();
        if raw.is_null() {
            tracing::warn!("native monitor creation failed, progress reads 0 and commands are ignored");
        } else {
            tracing::debug!(monitor = ?raw, "created native monitor");
        }

        let shared = Box::new(MonitorShared {
            api,
            config,
            handle: NativeHandle::new(raw),
            gate: ReentrantMutex::new(Cell::new(0)),
            operations: AtomicU32::new(0),
            progress_observers: ObserverList::new(),
            cancel_observers: ObserverList::new(),
            progress_installed: AtomicBool::new(false),
            cancel_installed: AtomicBool::new(false),
            on_progress: progress_trampoline::<A>,
            on_cancel_check: cancel_trampoline::<A>,
        });

        if !raw.is_null() {
            unsafe { shared.api.set_cancel_this(raw, shared.context()) };
        }

        let monitor = Self { shared };
        if let Some(milliseconds) = monitor.shared.config.deadline_ms {
            monitor.set_deadline_msecs(milliseconds);
        }
        monitor
    }

    /// Subscribe to progress notifications.
    ///
    /// The first subscription installs the native progress callback; it stays
    /// installed for the monitor's lifetime.
    pub fn on_progress<F>(&self, observer: F) -> Result<ObserverId>
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let shared = &*self.shared;
        let _gate = shared.gate.lock();
        shared.handle.verify_not_disposed()?;

        if let Some(raw) = shared.handle.live() {
            if !shared.progress_installed.swap(true, Ordering::AcqRel) {
                tracing::debug!(monitor = ?raw, "installing native progress callback");
                unsafe { shared.api.set_progress_func(raw, shared.on_progress) };
            }
        }

        let id = shared.progress_observers.push(Arc::new(observer));
        tracing::trace!(observer = %id, "progress observer subscribed");
        Ok(id)
    }

    /// Returns `false` if `id` was not subscribed to progress.
    pub fn remove_progress_observer(&self, id: ObserverId) -> bool {
        self.shared.progress_observers.remove(id)
    }

    /// Subscribe to cancellation polls.
    ///
    /// Observers share one [`CancelCheckEvent`] per poll; whatever `cancel`
    /// holds after the last observer ran is the answer given to the engine.
    pub fn on_cancel_check<F>(&self, observer: F) -> Result<ObserverId>
    where
        F: Fn(&mut CancelCheckEvent) + Send + Sync + 'static,
    {
        let shared = &*self.shared;
        let _gate = shared.gate.lock();
        shared.handle.verify_not_disposed()?;

        if let Some(raw) = shared.handle.live() {
            if !shared.cancel_installed.swap(true, Ordering::AcqRel) {
                tracing::debug!(monitor = ?raw, "installing native cancel callback");
                unsafe { shared.api.set_cancel_func(raw, shared.on_cancel_check) };
            }
        }

        let id = shared.cancel_observers.push(Arc::new(observer));
        tracing::trace!(observer = %id, "cancel observer subscribed");
        Ok(id)
    }

    /// Returns `false` if `id` was not subscribed to cancellation polls.
    pub fn remove_cancel_observer(&self, id: ObserverId) -> bool {
        self.shared.cancel_observers.remove(id)
    }

    /// Current progress percentage. Reads 0 once disposed or when the native
    /// object could not be created.
    pub fn progress(&self) -> i32 {
        let _gate = self.shared.gate.lock();
        self.shared.progress()
    }

    /// Abort the native operation `milliseconds` from now, independently of
    /// any cancel-check observer. No-op once disposed or without a native
    /// object.
    pub fn set_deadline_msecs(&self, milliseconds: i32) {
        let _gate = self.shared.gate.lock();
        match self.shared.handle.live() {
            Some(raw) => {
                tracing::debug!(monitor = ?raw, milliseconds, "setting native deadline");
                unsafe { self.shared.api.set_deadline_msecs(raw, milliseconds) };
            }
            None => tracing::trace!(milliseconds, "deadline ignored, no live native monitor"),
        }
    }

    /// [`set_deadline_msecs`](Self::set_deadline_msecs) with a `Duration`,
    /// saturating at `i32::MAX` milliseconds.
    pub fn set_deadline(&self, deadline: Duration) {
        let milliseconds = i32::try_from(deadline.as_millis()).unwrap_or(i32::MAX);
        self.set_deadline_msecs(milliseconds);
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.handle.is_disposed()
    }

    /// Fails with [`MonitorError::Disposed`](crate::MonitorError::Disposed)
    /// once the monitor has been disposed.
    pub fn verify_not_disposed(&self) -> Result<()> {
        self.shared.handle.verify_not_disposed()
    }

    /// True while the monitor is undisposed and owns a native object.
    pub fn is_valid(&self) -> bool {
        self.shared.handle.live().is_some()
    }

    /// Native monitor pointer, `None` once disposed or when native creation
    /// failed.
    ///
    /// The pointer is deleted by [`dispose`](Self::dispose) on any thread.
    /// Use [`begin_operation`](Self::begin_operation) to keep it alive for
    /// the length of a native call.
    pub fn raw_handle(&self) -> Option<RawMonitor> {
        self.shared.handle.live()
    }

    /// Mark a native call on this monitor's handle as running.
    ///
    /// While the returned guard lives, [`dispose`](Self::dispose) still
    /// disposes the monitor but leaves the native object allocated; the last
    /// guard to drop deletes it. `Ok(None)` when there is no native object to
    /// run against.
    pub fn begin_operation(&self) -> Result<Option<NativeOperation<'_, A>>> {
        let shared = &*self.shared;
        let _gate = shared.gate.lock();
        shared.handle.verify_not_disposed()?;

        Ok(shared.handle.live().map(|raw| {
            shared.operations.fetch_add(1, Ordering::AcqRel);
            NativeOperation { shared, raw }
        }))
    }

    pub fn progress_observer_count(&self) -> usize {
        self.shared.progress_observers.len()
    }

    pub fn cancel_observer_count(&self) -> usize {
        self.shared.cancel_observers.len()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Delete the native object and stop delivering callbacks. Idempotent.
    ///
    /// Blocks while another thread is inside a callback for this monitor.
    /// While a native operation is running (an observer disposing from a
    /// callback, or another thread between callbacks), the monitor is
    /// disposed at once and the native delete waits for the operation to end.
    pub fn dispose(&self) {
        let shared = &*self.shared;
        let depth = shared.gate.lock();
        if !shared.handle.mark_disposed() {
            return;
        }

        shared.progress_observers.clear();
        shared.cancel_observers.clear();

        if depth.get() > 0 || shared.operations.load(Ordering::Acquire) > 0 {
            tracing::debug!("monitor disposed during a native operation, deferring native delete");
            return;
        }
        shared.delete_native();
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &MonitorShared<A> {
        &self.shared
    }
}

impl<A: MonitorApi> Drop for Monitor<A> {
    fn drop(&mut self) {
        self.dispose();
        let _gate = self.shared.gate.lock();
        // Deferred delete from a dispose issued inside a callback
        self.shared.delete_native();
    }
}

impl<A: MonitorApi> fmt::Debug for Monitor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("disposed", &self.is_disposed())
            .field("valid", &self.is_valid())
            .field("native_allocated", &self.shared.handle.is_allocated())
            .field("progress_observers", &self.progress_observer_count())
            .field("cancel_observers", &self.cancel_observer_count())
            .finish()
    }
}

impl<A: MonitorApi> MonitorShared<A> {
    fn context(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }

    /// # Safety
    ///
    /// `context` must be null or a pointer registered by a live `Monitor<A>`.
    pub(crate) unsafe fn from_context<'a>(context: *mut c_void) -> Option<&'a Self> {
        unsafe { (context as *const Self).as_ref() }
    }

    pub(crate) fn cancel_on_observer_panic(&self) -> bool {
        self.config.cancel_on_observer_panic
    }

    fn progress(&self) -> i32 {
        match self.handle.live() {
            Some(raw) => unsafe { self.api.progress(raw) },
            None => 0,
        }
    }

    fn delete_native(&self) {
        if let Some(raw) = self.handle.take() {
            unsafe { self.api.delete(raw) };
            tracing::debug!(monitor = ?raw, "deleted native monitor");
        }
    }

    /// Notify progress observers. Always answers "continue".
    pub(crate) fn dispatch_progress(&self, left: i32, right: i32, top: i32, bottom: i32) -> bool {
        let depth = self.gate.lock();
        if self.handle.live().is_none() || self.progress_observers.is_empty() {
            return true;
        }
        let _scope = DispatchScope::enter(&depth);

        let event = ProgressEvent {
            left,
            right,
            top,
            bottom,
            progress: self.progress(),
        };
        tracing::trace!(?event, "dispatching progress");

        for observer in self.progress_observers.snapshot() {
            if self.handle.is_disposed() {
                break;
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(&event))) {
                tracing::error!(
                    "progress observer panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
        true
    }

    /// Poll cancel-check observers. Answers "do not cancel" when disposed or
    /// unobserved.
    pub(crate) fn dispatch_cancel_check(&self, words: i32) -> bool {
        let depth = self.gate.lock();
        if self.handle.live().is_none() || self.cancel_observers.is_empty() {
            return false;
        }
        let _scope = DispatchScope::enter(&depth);

        let mut event = CancelCheckEvent::new(words, self.progress());
        for observer in self.cancel_observers.snapshot() {
            if self.handle.is_disposed() {
                return false;
            }
            observer(&mut event);
        }

        if self.handle.is_disposed() {
            return false;
        }
        if event.cancel {
            tracing::debug!(words, progress = event.progress(), "observer requested cancellation");
        }
        event.cancel
    }
}

/// A native call in progress on a [`Monitor`]'s handle.
///
/// Obtained from [`Monitor::begin_operation`]. The handle stays allocated
/// until the guard drops, even if the monitor is disposed meanwhile.
pub struct NativeOperation<'a, A: MonitorApi> {
    shared: &'a MonitorShared<A>,
    raw: RawMonitor,
}

impl<A: MonitorApi> NativeOperation<'_, A> {
    /// Native monitor pointer to hand to the native call.
    pub fn raw(&self) -> RawMonitor {
        self.raw
    }
}

impl<A: MonitorApi> Drop for NativeOperation<'_, A> {
    fn drop(&mut self) {
        let shared = self.shared;
        let depth = shared.gate.lock();
        let remaining = shared.operations.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 && depth.get() == 0 && shared.handle.is_disposed() {
            tracing::debug!(monitor = ?self.raw, "native operation ended on a disposed monitor");
            shared.delete_native();
        }
    }
}

impl<A: MonitorApi> fmt::Debug for NativeOperation<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeOperation").field("raw", &self.raw).finish()
    }
}

/// Marks a dispatch in flight on the gate-holding thread; unwinds cleanly.
struct DispatchScope<'a> {
    depth: &'a Cell<u32>,
}

impl<'a> DispatchScope<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}
