// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

/// Errors surfaced by [`Monitor`](crate::Monitor) operations.
///
/// Faults raised by observers inside a native callback never become a
/// `MonitorError`; they are contained at the trampoline.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The monitor has been disposed and refuses further native interaction.
    #[error("monitor has been disposed")]
    Disposed,

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposed_message() {
        let err = MonitorError::Disposed;
        assert_eq!(err.to_string(), "monitor has been disposed");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MonitorError = io.into();
        assert!(matches!(err, MonitorError::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }
}
