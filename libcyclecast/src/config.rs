//! Configuration management for Cyclecast
//!
//! Every section is optional. Relative paths in the file are resolved
//! against the directory the file lives in; with no file they resolve
//! against the working directory. Credentials never live here, they are
//! read from the environment by the platform clients.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, CyclecastError, Result};
use crate::formatter::{Formatter, DEFAULT_DECORATION_PROBABILITY};
use crate::gate::{
    IntervalGate, StartupJitter, DEFAULT_MAX_INTERVAL_MINUTES, DEFAULT_MIN_INTERVAL_MINUTES,
};
use crate::media::{MediaPolicy, MediaResolver, MediaSelector, DEFAULT_FEATURED_EVERY};
use crate::platforms::{facebook, linkedin, PlatformKind};
use crate::types::Trigger;

pub const CONFIG_ENV: &str = "CYCLECAST_CONFIG";
pub const TRIGGER_ENV: &str = "CYCLECAST_TRIGGER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub formatting: FormattingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub facebook: FacebookConfig,
    #[serde(default)]
    pub linkedin: LinkedInConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_path")]
    pub path: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: default_content_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Posted-log file; defaults to a per-platform name next to the config
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_min_interval")]
    pub min_interval_minutes: u32,
    #[serde(default = "default_max_interval")]
    pub max_interval_minutes: u32,
    #[serde(default)]
    pub max_jitter_seconds: u64,
    #[serde(default = "default_batch_count")]
    pub batch_count: usize,
    #[serde(default = "default_batch_delay")]
    pub batch_delay: String,
    #[serde(default = "default_preview_count")]
    pub preview_count: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_interval_minutes: default_min_interval(),
            max_interval_minutes: default_max_interval(),
            max_jitter_seconds: 0,
            batch_count: default_batch_count(),
            batch_delay: default_batch_delay(),
            preview_count: default_preview_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaPolicyKind {
    #[default]
    None,
    Featured,
    RoundRobin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub policy: MediaPolicyKind,
    #[serde(default = "default_featured_every")]
    pub every: u32,
    #[serde(default)]
    pub featured: Option<String>,
    #[serde(default)]
    pub rotation: Vec<String>,
    /// Images are served from here instead of the local disk
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub base_dir: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            policy: MediaPolicyKind::None,
            every: default_featured_every(),
            featured: None,
            rotation: Vec::new(),
            base_url: None,
            base_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattingConfig {
    /// Replaces the built-in emoji set; an empty list disables decoration
    #[serde(default)]
    pub emojis: Option<Vec<String>>,
    #[serde(default = "default_decoration_probability")]
    pub decoration_probability: f64,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            emojis: None,
            decoration_probability: default_decoration_probability(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    /// Overridden by `FB_PAGE_ID`
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default = "default_facebook_api_version")]
    pub api_version: String,
    #[serde(default = "default_facebook_api_base")]
    pub api_base: String,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            page_id: None,
            api_version: default_facebook_api_version(),
            api_base: default_facebook_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    #[serde(default = "default_linkedin_api_base")]
    pub api_base: String,
    /// Overridden by `LINKEDIN_USER_ID`
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            api_base: default_linkedin_api_base(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub platform: PlatformKind,
}

fn default_content_path() -> String {
    "content.csv".to_string()
}

fn default_min_interval() -> u32 {
    DEFAULT_MIN_INTERVAL_MINUTES
}

fn default_max_interval() -> u32 {
    DEFAULT_MAX_INTERVAL_MINUTES
}

fn default_batch_count() -> usize {
    5
}

fn default_batch_delay() -> String {
    "30m".to_string()
}

fn default_preview_count() -> usize {
    3
}

fn default_featured_every() -> u32 {
    DEFAULT_FEATURED_EVERY
}

fn default_decoration_probability() -> f64 {
    DEFAULT_DECORATION_PROBABILITY
}

fn default_http_timeout() -> String {
    "30s".to_string()
}

fn default_facebook_api_version() -> String {
    facebook::DEFAULT_API_VERSION.to_string()
}

fn default_facebook_api_base() -> String {
    facebook::DEFAULT_API_BASE.to_string()
}

fn default_linkedin_api_base() -> String {
    linkedin::DEFAULT_API_BASE.to_string()
}

impl Config {
    /// Load configuration from `$CYCLECAST_CONFIG` or the default location.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file named by `$CYCLECAST_CONFIG` is an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if std::env::var_os(CONFIG_ENV).is_none() && !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let mut config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        config.base_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.interval_gate()?;
        self.http_timeout()?;
        self.batch_delay()?;

        if self.media.every == 0 {
            return Err(invalid("media.every", "must be at least 1"));
        }
        if self.media.policy == MediaPolicyKind::Featured && self.media.featured.is_none() {
            return Err(ConfigError::MissingField(
                "media.featured (required by the featured policy)".to_string(),
            )
            .into());
        }
        if !(0.0..=1.0).contains(&self.formatting.decoration_probability) {
            return Err(invalid(
                "formatting.decoration_probability",
                "must be between 0 and 1",
            ));
        }
        if self.schedule.batch_count == 0 {
            return Err(invalid("schedule.batch_count", "must be at least 1"));
        }

        Ok(())
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Resolve relative paths against `dir` instead of the working directory
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Expand `~` and anchor relative paths at the config directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
        match &self.base_dir {
            Some(dir) if expanded.is_relative() => dir.join(expanded),
            _ => expanded,
        }
    }

    pub fn content_path(&self) -> PathBuf {
        self.resolve_path(&self.content.path)
    }

    /// Posted-log file for `platform`
    pub fn log_path(&self, platform: PlatformKind) -> PathBuf {
        match &self.log.path {
            Some(path) => self.resolve_path(path),
            None => self.resolve_path(platform.default_log_file()),
        }
    }

    pub fn http_timeout(&self) -> Result<Duration> {
        parse_duration("http.timeout", &self.http.timeout)
    }

    pub fn batch_delay(&self) -> Result<Duration> {
        parse_duration("schedule.batch_delay", &self.schedule.batch_delay)
    }

    pub fn interval_gate(&self) -> Result<IntervalGate> {
        IntervalGate::new(
            self.schedule.min_interval_minutes,
            self.schedule.max_interval_minutes,
        )
    }

    pub fn startup_jitter(&self) -> StartupJitter {
        StartupJitter::new(self.schedule.max_jitter_seconds)
    }

    pub fn media_policy(&self) -> MediaPolicy {
        let media = &self.media;
        match (media.policy, &media.featured) {
            (MediaPolicyKind::None, _) => MediaPolicy::None,
            (MediaPolicyKind::Featured, Some(featured)) => MediaPolicy::Featured {
                every: media.every,
                featured: featured.clone(),
                rotation: media.rotation.clone(),
            },
            // Rejected by validate(); only reachable for hand-built configs
            (MediaPolicyKind::Featured, None) => MediaPolicy::None,
            (MediaPolicyKind::RoundRobin, featured) => {
                MediaPolicy::round_robin(media.every, media.rotation.clone(), featured.clone())
            }
        }
    }

    pub fn media_selector(&self) -> MediaSelector {
        MediaSelector::new(self.media_policy())
    }

    pub fn media_resolver(&self) -> MediaResolver {
        let base_dir = match &self.media.base_dir {
            Some(dir) => Some(self.resolve_path(dir)),
            None => self.base_dir.clone(),
        };
        MediaResolver::new(self.media.base_url.clone(), base_dir)
    }

    pub fn formatter(&self) -> Formatter {
        match &self.formatting.emojis {
            Some(emojis) => Formatter::new(emojis.clone(), self.formatting.decoration_probability),
            None => Formatter::default().with_probability(self.formatting.decoration_probability),
        }
    }
}

fn invalid(field: &str, reason: &str) -> CyclecastError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| invalid(field, &format!("'{}' is not a duration: {}", value, e)))
}

/// Resolve the configuration file path under the XDG config directory
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("cyclecast").join("config.toml"))
}

/// Work out what started this run.
///
/// `--manual` wins, then `CYCLECAST_TRIGGER`, then the GitHub Actions event
/// name. Anything else is a timer run.
pub fn resolve_trigger(manual_flag: bool) -> Result<Trigger> {
    if manual_flag {
        return Ok(Trigger::Manual);
    }

    if let Ok(value) = std::env::var(TRIGGER_ENV) {
        if !value.trim().is_empty() {
            return value.parse().map_err(CyclecastError::InvalidInput);
        }
    }

    if std::env::var_os("GITHUB_ACTIONS").is_some() {
        let event = std::env::var("GITHUB_EVENT_NAME").unwrap_or_default();
        if event == "workflow_dispatch" {
            return Ok(Trigger::Manual);
        }
    }

    Ok(Trigger::Timer)
}
