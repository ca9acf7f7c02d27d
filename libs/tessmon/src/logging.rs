// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Subscriber installation for hosts that don't bring their own.
//!
//! Library code only emits `tracing` events. A host application that already
//! installed a subscriber keeps it; [`init`] is a no-op in that case.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive (e.g. `tessmon=debug`).
pub const LOG_ENV_VAR: &str = "TESSMON_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install a stderr fmt subscriber filtered by [`LOG_ENV_VAR`].
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init();
        assert!(!init());
    }
}
