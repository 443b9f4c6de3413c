//! Core types for Cyclecast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One pre-written post from the content catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Stable identifier, the join key against the posted log
    pub id: String,
    /// Content pillar / category label
    #[serde(rename = "pillar")]
    pub category: String,
    /// Main post text
    #[serde(rename = "content")]
    pub body: String,
    /// Hashtag block, kept verbatim
    pub hashtags: String,
    /// Call to action
    pub cta: String,
}

impl PostRecord {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        body: impl Into<String>,
        hashtags: impl Into<String>,
        cta: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            body: body.into(),
            hashtags: hashtags.into(),
            cta: cta.into(),
        }
    }
}

/// A resolved image attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    /// Image on the local filesystem
    Path(PathBuf),
    /// Publicly reachable image URL
    Url(String),
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaRef::Path(path) => write!(f, "{}", path.display()),
            MediaRef::Url(url) => write!(f, "{}", url),
        }
    }
}

/// What started this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Started by a scheduler (cron, workflow schedule, task scheduler)
    Timer,
    /// Started by a person; bypasses the interval gate and startup jitter
    Manual,
}

impl Trigger {
    pub fn is_manual(self) -> bool {
        self == Trigger::Manual
    }
}

impl std::str::FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timer" | "schedule" | "scheduled" => Ok(Trigger::Timer),
            "manual" | "workflow_dispatch" => Ok(Trigger::Manual),
            other => Err(format!(
                "Invalid trigger: '{}'. Valid options: timer, manual",
                other
            )),
        }
    }
}

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Opaque id assigned by the remote platform
    pub remote_id: String,
    /// Whether the image made it onto the post
    pub media_attached: bool,
    /// Set when a requested attachment was dropped and the post went out text-only
    pub degraded: Option<String>,
}

impl Publication {
    pub fn text_only(remote_id: String) -> Self {
        Self {
            remote_id,
            media_attached: false,
            degraded: None,
        }
    }
}
