// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! libtesseract C API binding for the monitor function set.

use std::ffi::{c_int, c_void};

use super::{CancelFunc, MonitorApi, ProgressFunc, RawMonitor};

/// [`MonitorApi`] backed by the `TessMonitor*` functions of libtesseract.
#[derive(Debug, Default, Clone, Copy)]
pub struct TessApi;

impl MonitorApi for TessApi {
    fn create(&self) -> RawMonitor {
        unsafe { TessMonitorCreate() }
    }

    unsafe fn delete(&self, monitor: RawMonitor) {
        unsafe { TessMonitorDelete(monitor) }
    }

    unsafe fn set_progress_func(&self, monitor: RawMonitor, func: ProgressFunc) {
        unsafe { TessMonitorSetProgressFunc(monitor, func) }
    }

    unsafe fn set_cancel_func(&self, monitor: RawMonitor, func: CancelFunc) {
        unsafe { TessMonitorSetCancelFunc(monitor, func) }
    }

    unsafe fn set_cancel_this(&self, monitor: RawMonitor, context: *mut c_void) {
        unsafe { TessMonitorSetCancelThis(monitor, context) }
    }

    unsafe fn cancel_this(monitor: RawMonitor) -> *mut c_void {
        unsafe { TessMonitorGetCancelThis(monitor) }
    }

    unsafe fn progress(&self, monitor: RawMonitor) -> c_int {
        unsafe { TessMonitorGetProgress(monitor) }
    }

    unsafe fn set_deadline_msecs(&self, monitor: RawMonitor, milliseconds: c_int) {
        unsafe { TessMonitorSetDeadlineMSecs(monitor, milliseconds) }
    }
}

// External C declarations for the TessMonitor functions
#[link(name = "tesseract")]
unsafe extern "C" {
    fn TessMonitorCreate() -> RawMonitor;
    fn TessMonitorDelete(monitor: RawMonitor);
    fn TessMonitorSetCancelFunc(monitor: RawMonitor, cancel_func: CancelFunc);
    fn TessMonitorSetCancelThis(monitor: RawMonitor, cancel_this: *mut c_void);
    fn TessMonitorGetCancelThis(monitor: RawMonitor) -> *mut c_void;
    fn TessMonitorSetProgressFunc(monitor: RawMonitor, progress_func: ProgressFunc);
    fn TessMonitorGetProgress(monitor: RawMonitor) -> c_int;
    fn TessMonitorSetDeadlineMSecs(monitor: RawMonitor, deadline: c_int);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires libtesseract
    fn test_create_and_delete() {
        let api = TessApi;
        let monitor = api.create();
        assert!(!monitor.is_null());
        unsafe {
            assert_eq!(api.progress(monitor), 0);
            api.delete(monitor);
        }
    }
}
