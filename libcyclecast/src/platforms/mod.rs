//! Platform abstraction and implementations
//!
//! Every supported network implements [`Platform`]. The selection, formatting
//! and gating core never talks to a network directly; it hands finished text
//! and an optional image to a platform through [`crate::poster::publish`].
//!
//! # Examples
//!
//! ```no_run
//! use libcyclecast::platforms::{Platform, mock::MockPlatform};
//!
//! # async fn example() -> libcyclecast::Result<()> {
//! let mut platform = MockPlatform::success("mock");
//! platform.authenticate().await?;
//! let remote_id = platform.post("Hello from the catalog", None).await?;
//! println!("Posted: {}", remote_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::types::MediaRef;

pub mod facebook;
pub mod linkedin;

// Available in all builds so integration tests can drive the runner without a network
pub mod mock;

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    #[default]
    Facebook,
    LinkedIn,
}

impl PlatformKind {
    /// Posted-log file used when none is configured. Each network keeps its
    /// own log so they can share one catalog.
    pub fn default_log_file(self) -> &'static str {
        match self {
            PlatformKind::Facebook => "posted.json",
            PlatformKind::LinkedIn => "posted_linkedin.json",
        }
    }
}

impl std::str::FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facebook" | "fb" => Ok(PlatformKind::Facebook),
            "linkedin" => Ok(PlatformKind::LinkedIn),
            other => Err(format!(
                "Unknown platform: '{}'. Valid options: facebook, linkedin",
                other
            )),
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::Facebook => write!(f, "facebook"),
            PlatformKind::LinkedIn => write!(f, "linkedin"),
        }
    }
}

/// Platform-side reference to an uploaded image (photo id, asset URN, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unified interface to a social network
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lowercase platform identifier (e.g. "facebook")
    fn name(&self) -> &str;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    /// Resolve the account identity posts are published under.
    ///
    /// Networks that post as a fixed page need nothing here. Failure is
    /// terminal for the current publish attempt.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Identity` if the lookup fails.
    async fn authenticate(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether [`Platform::upload_media`] is implemented
    fn supports_media(&self) -> bool {
        false
    }

    /// Upload or register an image so it can be attached to a post
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Media` on any failure; callers fall back to a
    /// text-only post.
    async fn upload_media(&self, _media: &MediaRef) -> Result<MediaHandle> {
        Err(PlatformError::NotSupported(format!("{} does not support images", self.name())).into())
    }

    /// Publish `text`, optionally with an uploaded image, returning the remote post id
    ///
    /// # Errors
    ///
    /// - `PlatformError::Posting` if the network rejects the post
    /// - `PlatformError::Network` if the request cannot be completed
    async fn post(&self, text: &str, media: Option<&MediaHandle>) -> Result<String>;

    /// Ask the network to publish `text` at `at`
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::NotSupported` unless the network supports
    /// server-side scheduling.
    async fn schedule(&self, _text: &str, _at: DateTime<Utc>) -> Result<String> {
        Err(PlatformError::NotSupported(format!(
            "{} does not support scheduled posts",
            self.name()
        ))
        .into())
    }
}

/// Read `key` from the environment, treating blank values as unset
pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Shorten a response body for inclusion in an error message
pub(crate) fn excerpt(body: &str) -> String {
    crate::formatter::preview(body.trim(), 200)
}

/// Map a transport failure to a platform error
pub(crate) fn map_request_error(error: reqwest::Error, platform: &str, context: &str) -> PlatformError {
    if error.is_timeout() {
        PlatformError::Network(format!("{} request timed out during {}", platform, context))
    } else if error.is_connect() || error.is_request() {
        PlatformError::Network(format!(
            "{} unreachable during {}: {}",
            platform, context, error
        ))
    } else {
        PlatformError::Posting(format!("{} {} failed: {}", platform, context, error))
    }
}
