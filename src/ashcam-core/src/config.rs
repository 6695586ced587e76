//! Viewer configuration
//!
//! TOML-based configuration with named profiles, typically one profile per
//! webcam.

use anyhow::{bail, Context, Result};
use ashcam_client::DEFAULT_BASE_URL;
use ashcam_timeline::{GapPolicy, NavigatorConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub gaps: GapsConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Named profiles that can override base config
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

/// Remote image API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Webcam code, e.g. "ys-bbsn"
    #[serde(default = "default_webcam")]
    pub webcam: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts for the initial load, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_base_delay_ms: u64,
}

/// Fetch sizing and refresh cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_initial_days")]
    pub initial_days: u32,

    #[serde(default = "default_initial_limit")]
    pub initial_limit: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_jump_buffer")]
    pub jump_buffer: u64,

    #[serde(default = "default_refresh_cap")]
    pub refresh_cap: usize,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_interesting_limit")]
    pub interesting_limit: u32,
}

/// Expected capture cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapsConfig {
    #[serde(default = "default_interval")]
    pub expected_interval_secs: i64,

    #[serde(default = "default_tolerance")]
    pub tolerance_secs: i64,
}

/// Web viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_viewer_port")]
    pub port: u16,

    /// Directory holding the browser front end
    pub static_dir: Option<PathBuf>,
}

/// Profile for overriding settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub api: Option<ApiConfig>,
    pub timeline: Option<TimelineConfig>,
    pub gaps: Option<GapsConfig>,
    pub viewer: Option<ViewerConfig>,
}

// Default value functions
fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_webcam() -> String { "ys-bbsn".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_delay() -> u64 { 1000 }
fn default_initial_days() -> u32 { 7 }
fn default_initial_limit() -> u32 { 500 }
fn default_page_size() -> u32 { 100 }
fn default_jump_buffer() -> u64 { 50 }
fn default_refresh_cap() -> usize { 1000 }
fn default_refresh_interval() -> u64 { 900 }
fn default_interesting_limit() -> u32 { 50 }
fn default_interval() -> i64 { ashcam_timeline::EXPECTED_INTERVAL_SECS }
fn default_tolerance() -> i64 { ashcam_timeline::TOLERANCE_SECS }
fn default_viewer_port() -> u16 { 8080 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            webcam: default_webcam(),
            timeout_secs: default_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_delay(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            initial_days: default_initial_days(),
            initial_limit: default_initial_limit(),
            page_size: default_page_size(),
            jump_buffer: default_jump_buffer(),
            refresh_cap: default_refresh_cap(),
            refresh_interval_secs: default_refresh_interval(),
            interesting_limit: default_interesting_limit(),
        }
    }
}

impl Default for GapsConfig {
    fn default() -> Self {
        Self {
            expected_interval_secs: default_interval(),
            tolerance_secs: default_tolerance(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            port: default_viewer_port(),
            static_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file, or the default file if it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Apply a named profile, merging settings
    ///
    /// Profile settings override base configuration values.
    pub fn apply_profile(mut self, profile_name: &str) -> Result<Self> {
        let profile = self
            .profiles
            .get(profile_name)
            .with_context(|| format!("Profile '{}' not found", profile_name))?
            .clone();

        if let Some(api) = profile.api {
            self.api = api;
        }
        if let Some(timeline) = profile.timeline {
            self.timeline = timeline;
        }
        if let Some(gaps) = profile.gaps {
            self.gaps = gaps;
        }
        if let Some(viewer) = profile.viewer {
            self.viewer = viewer;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.webcam.trim().is_empty() {
            bail!("api.webcam must not be empty");
        }
        if self.gaps.expected_interval_secs <= 0 {
            bail!("gaps.expected_interval_secs must be positive");
        }
        if self.gaps.tolerance_secs < 0 || self.gaps.tolerance_secs >= self.gaps.expected_interval_secs {
            bail!("gaps.tolerance_secs must be between 0 and expected_interval_secs");
        }
        if self.timeline.refresh_interval_secs == 0 {
            bail!("timeline.refresh_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn navigator_config(&self) -> NavigatorConfig {
        NavigatorConfig {
            initial_days: self.timeline.initial_days,
            initial_limit: self.timeline.initial_limit,
            page_size: self.timeline.page_size,
            jump_buffer: self.timeline.jump_buffer,
            refresh_cap: self.timeline.refresh_cap,
            retry: RetryPolicy {
                attempts: self.api.retry_attempts,
                base_delay: Duration::from_millis(self.api.retry_base_delay_ms),
            },
            gaps: GapPolicy {
                expected_interval_secs: self.gaps.expected_interval_secs,
                tolerance_secs: self.gaps.tolerance_secs,
            },
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.timeline.refresh_interval_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

/// `<config dir>/ashcam/ashcam.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ashcam").join("ashcam.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.api.webcam, "ys-bbsn");
        assert_eq!(config.gaps.expected_interval_secs, 900);
        assert_eq!(config.gaps.tolerance_secs, 180);
        assert_eq!(config.refresh_interval(), Duration::from_secs(900));

        let nav = config.navigator_config();
        assert_eq!(nav.gaps, GapPolicy::default());
        assert_eq!(nav.retry.attempts, 3);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [api]
            webcam = "ak-spurr"

            [timeline]
            page_size = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.api.webcam, "ak-spurr");
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeline.page_size, 25);
        assert_eq!(config.timeline.initial_days, 7);
    }

    #[test]
    fn test_profile_overrides() {
        let config = Config::from_toml(
            r#"
            [profiles.fast-cam.api]
            webcam = "hi-kilauea"

            [profiles.fast-cam.gaps]
            expected_interval_secs = 300
            tolerance_secs = 60
            "#,
        )
        .unwrap()
        .apply_profile("fast-cam")
        .unwrap();

        assert_eq!(config.api.webcam, "hi-kilauea");
        assert_eq!(config.navigator_config().gaps.threshold_secs(), 360);
    }

    #[test]
    fn test_unknown_profile() {
        assert!(Config::default().apply_profile("missing").is_err());
    }

    #[test]
    fn test_rejects_bad_cadence() {
        let err = Config::from_toml(
            r#"
            [gaps]
            expected_interval_secs = 0
            "#,
        );
        assert!(err.is_err());

        let err = Config::from_toml(
            r#"
            [gaps]
            expected_interval_secs = 600
            tolerance_secs = 600
            "#,
        );
        assert!(err.is_err());
    }
}
