// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Native monitor ABI.
//!
//! The recognition engine keeps its progress and cancellation state in an
//! opaque `ETEXT_DESC` object. [`MonitorApi`] is the fixed function set used
//! to create, configure, query and delete such an object; the engine calls
//! back through the [`ProgressFunc`] / [`CancelFunc`] pointers installed on it.

use std::ffi::{c_int, c_void};

pub mod simulated;
#[cfg(feature = "tesseract")]
pub mod tesseract;

// Opaque ETEXT_DESC type
#[repr(C)]
pub struct EtextDesc {
    _opaque: [u8; 0],
}

/// Pointer to a native monitor object. Null means "no object".
pub type RawMonitor = *mut EtextDesc;

/// Called by the engine as recognition moves to a new region.
/// The return value is ignored by the engine.
pub type ProgressFunc = extern "C" fn(
    ths: RawMonitor,
    left: c_int,
    right: c_int,
    top: c_int,
    bottom: c_int,
) -> bool;

/// Polled by the engine with the number of words processed so far.
/// Returning `true` stops the recognition.
pub type CancelFunc = extern "C" fn(cancel_this: *mut c_void, words: c_int) -> bool;

/// Function set for one native monitor implementation.
///
/// Every `unsafe` method requires `monitor` to be a non-null pointer obtained
/// from [`MonitorApi::create`] on the same implementation and not yet passed
/// to [`MonitorApi::delete`].
pub trait MonitorApi: Send + Sync + 'static {
    /// Allocate a native monitor. Returns null on failure.
    fn create(&self) -> RawMonitor;

    /// Release a native monitor. Must be called at most once per pointer.
    unsafe fn delete(&self, monitor: RawMonitor);

    unsafe fn set_progress_func(&self, monitor: RawMonitor, func: ProgressFunc);

    unsafe fn set_cancel_func(&self, monitor: RawMonitor, func: CancelFunc);

    /// Store the context pointer handed to the cancel callback.
    unsafe fn set_cancel_this(&self, monitor: RawMonitor, context: *mut c_void);

    /// Read the context pointer back.
    ///
    /// Takes no receiver: the progress callback only gets the native monitor
    /// pointer and has to recover everything else from it.
    unsafe fn cancel_this(monitor: RawMonitor) -> *mut c_void;

    /// Current progress percentage.
    unsafe fn progress(&self, monitor: RawMonitor) -> c_int;

    /// Abort the running operation once `milliseconds` have elapsed from now.
    /// Non-positive values leave the deadline unset.
    unsafe fn set_deadline_msecs(&self, monitor: RawMonitor, milliseconds: c_int);
}
