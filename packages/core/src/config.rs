//! Editor configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest debounce accepted; anything above this would make autosave feel broken
const MAX_AUTOSAVE_DEBOUNCE_MS: u64 = 60_000;

pub const ENV_AUTOSAVE_DEBOUNCE_MS: &str = "TUNEFLOW_AUTOSAVE_DEBOUNCE_MS";
pub const ENV_SAVING_MIN_MS: &str = "TUNEFLOW_SAVING_MIN_MS";
pub const ENV_CACHE_DIR: &str = "TUNEFLOW_CACHE_DIR";

/// Configuration for one graph editor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period after the last mutation before an autosave push starts
    pub autosave_debounce_ms: u64,

    /// Minimum time the "saving" indicator stays visible
    pub saving_indicator_min_ms: u64,

    /// Buffer size of the domain event channel
    pub event_channel_capacity: usize,

    /// Directory for the local snapshot cache (defaults to ~/.tuneflow/graph-cache)
    pub cache_dir: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 1000,
            saving_indicator_min_ms: 600,
            event_channel_capacity: 256,
            cache_dir: None,
        }
    }
}

impl EditorConfig {
    /// Defaults with `TUNEFLOW_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup; unparsable values are ignored
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_AUTOSAVE_DEBOUNCE_MS) {
            match raw.parse() {
                Ok(ms) => {
                    tracing::info!(
                        "Using autosave debounce from {}: {}ms",
                        ENV_AUTOSAVE_DEBOUNCE_MS,
                        ms
                    );
                    self.autosave_debounce_ms = ms;
                }
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_AUTOSAVE_DEBOUNCE_MS, raw),
            }
        }

        if let Some(raw) = lookup(ENV_SAVING_MIN_MS) {
            match raw.parse() {
                Ok(ms) => {
                    tracing::info!(
                        "Using saving indicator minimum from {}: {}ms",
                        ENV_SAVING_MIN_MS,
                        ms
                    );
                    self.saving_indicator_min_ms = ms;
                }
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_SAVING_MIN_MS, raw),
            }
        }

        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            tracing::info!("Using cache directory from {}: {}", ENV_CACHE_DIR, dir);
            self.cache_dir = Some(PathBuf::from(dir));
        }

        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn min_saving_display(&self) -> Duration {
        Duration::from_millis(self.saving_indicator_min_ms)
    }

    /// Cache directory, falling back to ~/.tuneflow/graph-cache
    pub fn resolve_cache_dir(&self) -> Result<PathBuf, std::io::Error> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }

        let home_dir = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Cannot determine home directory",
            )
        })?;

        Ok(home_dir.join(".tuneflow").join("graph-cache"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.autosave_debounce_ms == 0 {
            return Err("autosave_debounce_ms must be greater than 0".to_string());
        }

        if self.autosave_debounce_ms > MAX_AUTOSAVE_DEBOUNCE_MS {
            return Err(format!(
                "autosave_debounce_ms cannot exceed {}",
                MAX_AUTOSAVE_DEBOUNCE_MS
            ));
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.autosave_debounce_ms, 1000);
        assert_eq!(config.saving_indicator_min_ms, 600);
        assert_eq!(config.event_channel_capacity, 256);
        assert!(config.cache_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EditorConfig::default();
        config.autosave_debounce_ms = 0;
        assert!(config.validate().is_err());

        config.autosave_debounce_ms = MAX_AUTOSAVE_DEBOUNCE_MS + 1;
        assert!(config.validate().is_err());

        config = EditorConfig::default();
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());

        // A zero display minimum just disables the anti-flicker window
        config = EditorConfig::default();
        config.saving_indicator_min_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_AUTOSAVE_DEBOUNCE_MS, "250"),
            (ENV_SAVING_MIN_MS, "not-a-number"),
            (ENV_CACHE_DIR, "/tmp/tuneflow-cache"),
        ]);

        let config =
            EditorConfig::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.min_saving_display(), Duration::from_millis(600));
        assert_eq!(
            config.resolve_cache_dir().unwrap(),
            PathBuf::from("/tmp/tuneflow-cache")
        );
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"autosave_debounce_ms": 50}"#).unwrap();
        assert_eq!(config.autosave_debounce_ms, 50);
        assert_eq!(config.event_channel_capacity, 256);
    }
}
