// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

// Raw-pointer methods on MonitorApi share one safety contract, documented on the trait
#![allow(clippy::missing_safety_doc)]

//! Progress and cancellation monitoring for native OCR recognition.
//!
//! A [`Monitor`] owns a native monitor object. Hold a
//! [`begin_operation`](Monitor::begin_operation) guard around the
//! long-running recognition call, hand it the guard's handle, and subscribe to [`on_progress`](Monitor::on_progress) /
//! [`on_cancel_check`](Monitor::on_cancel_check) to observe it or stop it
//! cooperatively. The native side is reached through [`MonitorApi`]:
//! `TessApi` links libtesseract (feature `tesseract`), and
//! [`SimulatedEngine`](native::simulated::SimulatedEngine) runs the same
//! protocol in-process.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod native;

mod handle;
mod monitor;
mod observers;
mod trampoline;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use events::{CancelCheckEvent, ObserverId, ProgressEvent};
pub use monitor::{Monitor, NativeOperation};
pub use native::{CancelFunc, EtextDesc, MonitorApi, ProgressFunc, RawMonitor};

#[cfg(feature = "tesseract")]
pub use native::tesseract::TessApi;

/// Monitor backed by libtesseract.
#[cfg(feature = "tesseract")]
pub type TessMonitor = Monitor<TessApi>;
