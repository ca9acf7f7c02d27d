// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-process stand-in for the native recognition engine.
//!
//! Native monitor objects are heap records owned through raw pointers, and
//! callbacks are invoked through the installed `extern "C"` function
//! pointers, so a [`Monitor`] driven by this engine crosses the same ABI it
//! would with libtesseract.

use std::ffi::{c_int, c_void};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{CancelFunc, MonitorApi, ProgressFunc, RawMonitor};
use crate::Monitor;
use crate::error::Result;

/// Bounding box of one recognized word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBox {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl WordBox {
    pub const fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

/// How a simulated recognition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The cancel callback answered `true`.
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recognition {
    pub outcome: Outcome,
    pub words_processed: usize,
}

/// Counters of native calls, shared by every clone of an engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    created: AtomicUsize,
    deleted: AtomicUsize,
    progress_installs: AtomicUsize,
    cancel_installs: AtomicUsize,
    deadline_sets: AtomicUsize,
}

impl EngineStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn progress_installs(&self) -> usize {
        self.progress_installs.load(Ordering::SeqCst)
    }

    pub fn cancel_installs(&self) -> usize {
        self.cancel_installs.load(Ordering::SeqCst)
    }

    pub fn deadline_sets(&self) -> usize {
        self.deadline_sets.load(Ordering::SeqCst)
    }

    /// Native objects created and not yet deleted.
    pub fn live(&self) -> usize {
        self.created() - self.deleted()
    }
}

struct DescState {
    progress: c_int,
    progress_func: Option<ProgressFunc>,
    cancel_func: Option<CancelFunc>,
    cancel_this: *mut c_void,
    deadline: Option<Instant>,
}

/// Native-side monitor record.
struct SimulatedDesc {
    state: Mutex<DescState>,
}

impl SimulatedDesc {
    fn new() -> Self {
        Self {
            state: Mutex::new(DescState {
                progress: 0,
                progress_func: None,
                cancel_func: None,
                cancel_this: std::ptr::null_mut(),
                deadline: None,
            }),
        }
    }

    unsafe fn from_raw<'a>(monitor: RawMonitor) -> &'a SimulatedDesc {
        unsafe { &*(monitor as *const SimulatedDesc) }
    }
}

/// Simulated recognition engine implementing [`MonitorApi`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedEngine {
    stats: Arc<EngineStats>,
    fail_create: bool,
    word_delay: Duration,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose `create` always fails.
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    /// Sleep this long per word during [`recognize`](Self::recognize).
    pub fn with_word_delay(mut self, delay: Duration) -> Self {
        self.word_delay = delay;
        self
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Run a recognition over `words`, driving the callbacks installed on
    /// `monitor`.
    ///
    /// For each word: progress is updated and the progress callback fires
    /// with the word's bounds, then the cancel callback is polled with the
    /// number of words done, then the deadline is checked.
    ///
    /// # Safety
    ///
    /// `monitor` must be a live pointer created by this engine.
    pub unsafe fn recognize(&self, monitor: RawMonitor, words: &[WordBox]) -> Recognition {
        let desc = unsafe { SimulatedDesc::from_raw(monitor) };
        let total = words.len();

        for (index, word) in words.iter().enumerate() {
            if !self.word_delay.is_zero() {
                std::thread::sleep(self.word_delay);
            }

            let done = index + 1;
            // Copy out so callbacks can query the monitor without deadlocking
            let (progress_func, cancel_func, cancel_this, deadline) = {
                let mut state = desc.state.lock();
                state.progress = ((done * 100) / total) as c_int;
                (
                    state.progress_func,
                    state.cancel_func,
                    state.cancel_this,
                    state.deadline,
                )
            };

            if let Some(func) = progress_func {
                func(monitor, word.left, word.right, word.top, word.bottom);
            }

            if let Some(func) = cancel_func {
                if func(cancel_this, word_count(done)) {
                    tracing::debug!(words = done, "simulated recognition cancelled");
                    return Recognition {
                        outcome: Outcome::Cancelled,
                        words_processed: done,
                    };
                }
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::debug!(words = done, "simulated recognition hit its deadline");
                return Recognition {
                    outcome: Outcome::DeadlineExceeded,
                    words_processed: done,
                };
            }
        }

        Recognition {
            outcome: Outcome::Completed,
            words_processed: total,
        }
    }

    /// Run a recognition monitored by `monitor`.
    ///
    /// A monitor without a native object leaves the recognition unmonitored,
    /// so it always completes. A disposed monitor is rejected. Disposing the
    /// monitor from another thread mid-recognition leaves the native object
    /// allocated until the recognition returns.
    pub fn recognize_with(
        &self,
        monitor: &Monitor<SimulatedEngine>,
        words: &[WordBox],
    ) -> Result<Recognition> {
        match monitor.begin_operation()? {
            Some(operation) => Ok(unsafe { self.recognize(operation.raw(), words) }),
            None => Ok(Recognition {
                outcome: Outcome::Completed,
                words_processed: words.len(),
            }),
        }
    }

    /// Invoke the installed progress callback directly.
    /// Returns `None` when no callback is installed.
    ///
    /// # Safety
    ///
    /// `monitor` must be a live pointer created by this engine.
    pub unsafe fn fire_progress(
        &self,
        monitor: RawMonitor,
        left: i32,
        right: i32,
        top: i32,
        bottom: i32,
    ) -> Option<bool> {
        let func = unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().progress_func;
        func.map(|func| func(monitor, left, right, top, bottom))
    }

    /// Invoke the installed cancel callback directly.
    /// Returns `None` when no callback is installed.
    ///
    /// # Safety
    ///
    /// `monitor` must be a live pointer created by this engine.
    pub unsafe fn fire_cancel_check(&self, monitor: RawMonitor, words: i32) -> Option<bool> {
        let (func, cancel_this) = {
            let state = unsafe { SimulatedDesc::from_raw(monitor) }.state.lock();
            (state.cancel_func, state.cancel_this)
        };
        func.map(|func| func(cancel_this, words))
    }

    /// Overwrite the progress percentage, as the engine does between words.
    ///
    /// # Safety
    ///
    /// `monitor` must be a live pointer created by this engine.
    pub unsafe fn set_progress(&self, monitor: RawMonitor, progress: i32) {
        unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().progress = progress;
    }
}

/// Words processed as reported to the cancel callback, saturating at
/// `c_int::MAX`.
fn word_count(done: usize) -> c_int {
    c_int::try_from(done).unwrap_or(c_int::MAX)
}

impl MonitorApi for SimulatedEngine {
    fn create(&self) -> RawMonitor {
        if self.fail_create {
            return std::ptr::null_mut();
        }
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Box::into_raw(Box::new(SimulatedDesc::new())) as RawMonitor
    }

    unsafe fn delete(&self, monitor: RawMonitor) {
        drop(unsafe { Box::from_raw(monitor as *mut SimulatedDesc) });
        self.stats.deleted.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn set_progress_func(&self, monitor: RawMonitor, func: ProgressFunc) {
        unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().progress_func = Some(func);
        self.stats.progress_installs.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn set_cancel_func(&self, monitor: RawMonitor, func: CancelFunc) {
        unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().cancel_func = Some(func);
        self.stats.cancel_installs.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn set_cancel_this(&self, monitor: RawMonitor, context: *mut c_void) {
        unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().cancel_this = context;
    }

    unsafe fn cancel_this(monitor: RawMonitor) -> *mut c_void {
        unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().cancel_this
    }

    unsafe fn progress(&self, monitor: RawMonitor) -> c_int {
        unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().progress
    }

    unsafe fn set_deadline_msecs(&self, monitor: RawMonitor, milliseconds: c_int) {
        self.stats.deadline_sets.fetch_add(1, Ordering::SeqCst);
        if milliseconds <= 0 {
            return;
        }
        let deadline = Instant::now() + Duration::from_millis(milliseconds as u64);
        unsafe { SimulatedDesc::from_raw(monitor) }.state.lock().deadline = Some(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    static LAST_WORDS: AtomicI32 = AtomicI32::new(-1);

    extern "C" fn stop_at_three(_cancel_this: *mut c_void, words: c_int) -> bool {
        LAST_WORDS.store(words, Ordering::SeqCst);
        words >= 3
    }

    fn page(count: usize) -> Vec<WordBox> {
        (0..count as i32)
            .map(|i| WordBox::new(i * 10, i * 10 + 8, 0, 12))
            .collect()
    }

    #[test]
    fn test_word_count_saturates() {
        assert_eq!(word_count(7), 7);
        assert_eq!(word_count(c_int::MAX as usize), c_int::MAX);
        assert_eq!(word_count(c_int::MAX as usize + 1), c_int::MAX);
    }

    #[test]
    fn test_create_delete_counts() {
        let engine = SimulatedEngine::new();
        let monitor = engine.create();
        assert!(!monitor.is_null());
        assert_eq!(engine.stats().live(), 1);
        unsafe { engine.delete(monitor) };
        assert_eq!(engine.stats().created(), 1);
        assert_eq!(engine.stats().deleted(), 1);
        assert_eq!(engine.stats().live(), 0);
    }

    #[test]
    fn test_failing_engine_returns_null() {
        let engine = SimulatedEngine::failing();
        assert!(engine.create().is_null());
        assert_eq!(engine.stats().created(), 0);
    }

    #[test]
    fn test_unmonitored_recognition_completes_with_full_progress() {
        let engine = SimulatedEngine::new();
        let monitor = engine.create();
        let result = unsafe { engine.recognize(monitor, &page(4)) };
        assert_eq!(
            result,
            Recognition {
                outcome: Outcome::Completed,
                words_processed: 4
            }
        );
        assert_eq!(unsafe { engine.progress(monitor) }, 100);
        assert_eq!(unsafe { engine.fire_progress(monitor, 0, 0, 0, 0) }, None);
        unsafe { engine.delete(monitor) };
    }

    #[test]
    fn test_cancel_func_stops_recognition() {
        let engine = SimulatedEngine::new();
        let monitor = engine.create();
        unsafe { engine.set_cancel_func(monitor, stop_at_three) };

        let result = unsafe { engine.recognize(monitor, &page(10)) };
        assert_eq!(result.outcome, Outcome::Cancelled);
        assert_eq!(result.words_processed, 3);
        assert_eq!(LAST_WORDS.load(Ordering::SeqCst), 3);
        assert_eq!(unsafe { engine.progress(monitor) }, 30);
        unsafe { engine.delete(monitor) };
    }

    #[test]
    fn test_deadline_stops_recognition() {
        let engine = SimulatedEngine::new().with_word_delay(Duration::from_millis(5));
        let monitor = engine.create();
        unsafe { engine.set_deadline_msecs(monitor, 1) };

        let result = unsafe { engine.recognize(monitor, &page(50)) };
        assert_eq!(result.outcome, Outcome::DeadlineExceeded);
        assert!(result.words_processed < 50);
        unsafe { engine.delete(monitor) };
    }

    #[test]
    fn test_non_positive_deadline_is_ignored() {
        let engine = SimulatedEngine::new().with_word_delay(Duration::from_millis(1));
        let monitor = engine.create();
        unsafe { engine.set_deadline_msecs(monitor, 0) };
        unsafe { engine.set_deadline_msecs(monitor, -5) };

        let result = unsafe { engine.recognize(monitor, &page(3)) };
        assert_eq!(result.outcome, Outcome::Completed);
        assert_eq!(engine.stats().deadline_sets(), 2);
        unsafe { engine.delete(monitor) };
    }

    #[test]
    fn test_cancel_this_round_trip() {
        let engine = SimulatedEngine::new();
        let monitor = engine.create();
        let mut marker = 7u8;
        let context = &mut marker as *mut u8 as *mut c_void;
        unsafe {
            engine.set_cancel_this(monitor, context);
            assert_eq!(SimulatedEngine::cancel_this(monitor), context);
            engine.delete(monitor);
        }
    }
}
