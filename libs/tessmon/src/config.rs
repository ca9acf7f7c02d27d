// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Monitor configuration via `tessmon.yaml`.

use crate::error::{MonitorError, Result};
use serde::Deserialize;
use std::path::Path;

/// Per-monitor settings applied at construction and consulted by the
/// cancellation trampoline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Deadline handed to the native object right after it is created.
    /// Non-positive values are ignored by the native engine.
    pub deadline_ms: Option<i32>,

    /// Answer given to the native engine when a cancel-check observer panics.
    /// `false` keeps the recognition running.
    pub cancel_on_observer_panic: bool,
}

impl MonitorConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "tessmon.yaml";

    pub fn with_deadline_ms(mut self, milliseconds: i32) -> Self {
        self.deadline_ms = Some(milliseconds);
        self
    }

    pub fn with_cancel_on_observer_panic(mut self, cancel: bool) -> Self {
        self.cancel_on_observer_panic = cancel;
        self
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| MonitorError::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a directory. Fails with
    /// [`MonitorError::Io`] if the file cannot be read and
    /// [`MonitorError::Configuration`] if it cannot be parsed.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        let content = std::fs::read_to_string(&config_path)?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            MonitorError::Configuration(format!(
                "Failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })?;

        tracing::info!("Loaded monitor config from {}", config_path.display());
        Ok(config)
    }

    /// Load configuration from a directory, returning defaults if the file
    /// is missing or unparseable.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(
                "No {} found in {}, using defaults",
                Self::FILE_NAME,
                dir.display()
            );
            return Self::default();
        }

        match Self::load(dir) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.deadline_ms, None);
        assert!(!config.cancel_on_observer_panic);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = MonitorConfig::from_yaml("deadline_ms: 2500\n").unwrap();
        assert_eq!(config.deadline_ms, Some(2500));
        assert!(!config.cancel_on_observer_panic);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MonitorConfig::FILE_NAME),
            "deadline_ms: 100\ncancel_on_observer_panic: true\n",
        )
        .unwrap();

        let config = MonitorConfig::load(dir.path()).unwrap();
        assert_eq!(
            config,
            MonitorConfig::default()
                .with_deadline_ms(100)
                .with_cancel_on_observer_panic(true)
        );
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MonitorConfig::load(dir.path()).unwrap_err();
        assert!(
            matches!(&err, MonitorError::Io(io) if io.kind() == std::io::ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_load_unparseable_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MonitorConfig::FILE_NAME),
            "cancel_on_observer_panic: sometimes\n",
        )
        .unwrap();

        let err = MonitorConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(_)));
    }

    #[test]
    fn test_load_or_default_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MonitorConfig::FILE_NAME),
            "deadline_ms: [not, a, number]\n",
        )
        .unwrap();

        assert_eq!(
            MonitorConfig::load_or_default(dir.path()),
            MonitorConfig::default()
        );
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            MonitorConfig::load_or_default(dir.path()),
            MonitorConfig::default()
        );
    }
}
