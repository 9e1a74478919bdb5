//! Engine settings, loaded from RON.
//!
//! Every field has a default, so an empty document `()` is valid:
//!
//! ```ron
//! (
//!     executor: (workers: 4, capacity: 64, default_timeout_ms: 1000),
//!     periodic: (hold_ms: 10, default_interval_ms: 100),
//! )
//! ```

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{Error, Result, periodic::HOLD_DURATION_MS};

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Bounded executor tuning.
    pub executor: ExecutorSettings,
    /// Periodic task defaults.
    pub periodic: PeriodicSettings,
}

impl Settings {
    /// Parse settings from RON text and validate them.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let settings: Self = ron::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a RON settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.executor.validate()?;
        self.periodic.validate()
    }
}

/// Bounded executor tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorSettings {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum outstanding (queued or running) jobs.
    pub capacity: usize,
    /// Timeout budget for `submit_default`.
    pub default_timeout_ms: u64,
    /// Deadline applied when the executor is dropped.
    pub shutdown_deadline_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            capacity: 64,
            default_timeout_ms: 1000,
            shutdown_deadline_ms: 2000,
        }
    }
}

impl ExecutorSettings {
    /// Reject empty pools and zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidSettings(
                "executor.workers must be at least 1".into(),
            ));
        }
        if self.capacity == 0 {
            return Err(Error::InvalidSettings(
                "executor.capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Defaults for periodic tasks created by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeriodicSettings {
    /// Press-to-release delay.
    pub hold_ms: u64,
    /// Interval used when a caller does not supply one.
    pub default_interval_ms: u64,
}

impl Default for PeriodicSettings {
    fn default() -> Self {
        Self {
            hold_ms: HOLD_DURATION_MS,
            default_interval_ms: 100,
        }
    }
}

impl PeriodicSettings {
    /// Reject a zero default interval.
    pub fn validate(&self) -> Result<()> {
        if self.default_interval_ms == 0 {
            return Err(Error::InvalidSettings(
                "periodic.default_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Hold duration.
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Default interval.
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write, process};

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let s = Settings::from_ron_str("()").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.executor.workers, 4);
        assert_eq!(s.periodic.hold(), Duration::from_millis(HOLD_DURATION_MS));
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let s = Settings::from_ron_str("(executor: (capacity: 8), periodic: (hold_ms: 25))")
            .unwrap();
        assert_eq!(s.executor.capacity, 8);
        assert_eq!(s.executor.workers, 4);
        assert_eq!(s.periodic.hold_ms, 25);
        assert_eq!(s.periodic.default_interval_ms, 100);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            Settings::from_ron_str("(executor: (workers: 0))"),
            Err(Error::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_ron_str("(periodic: (default_interval_ms: 0))"),
            Err(Error::InvalidSettings(_))
        ));
    }

    #[test]
    fn syntax_and_unknown_fields_rejected() {
        assert!(matches!(
            Settings::from_ron_str("(executor: (workers: ))"),
            Err(Error::ParseSettings(_))
        ));
        assert!(matches!(
            Settings::from_ron_str("(threads: 3)"),
            Err(Error::ParseSettings(_))
        ));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = env::temp_dir().join(format!("autokey-settings-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.ron");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"(executor: (workers: 2, capacity: 3))").unwrap();
        drop(f);

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.executor.workers, 2);
        assert_eq!(s.executor.capacity, 3);

        let missing = dir.join("missing.ron");
        assert!(matches!(
            Settings::load(&missing),
            Err(Error::ReadSettings { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
