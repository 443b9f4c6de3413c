//! Mock platform implementation for testing
//!
//! Simulates identity, upload and posting outcomes without credentials or
//! network access. Counters and recorded posts live behind `Arc<Mutex<_>>` so
//! a test can keep a clone of the [`MockConfig`] and inspect it after the
//! platform has been boxed and handed to a runner.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::{MediaHandle, Platform};
use crate::types::MediaRef;

/// A post as the mock received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPost {
    pub text: String,
    pub media: Option<String>,
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name (e.g., "mock-facebook")
    pub name: String,

    /// Whether identity lookup should succeed
    pub identity_succeeds: bool,

    /// Whether posting should succeed
    pub post_succeeds: bool,

    /// Whether image uploads should succeed
    pub media_succeeds: bool,

    /// Whether the platform claims image support at all
    pub supports_media: bool,

    pub identity_error: Option<String>,
    pub post_error: Option<String>,
    pub media_error: Option<String>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Whether the platform is configured
    pub is_configured: bool,

    pub auth_call_count: Arc<Mutex<usize>>,
    pub upload_call_count: Arc<Mutex<usize>>,
    pub post_call_count: Arc<Mutex<usize>>,

    /// Posts that have been made (for verification)
    pub posts: Arc<Mutex<Vec<MockPost>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            identity_succeeds: true,
            post_succeeds: true,
            media_succeeds: true,
            supports_media: true,
            identity_error: None,
            post_error: None,
            media_error: None,
            delay: Duration::from_millis(0),
            is_configured: true,
            auth_call_count: Arc::new(Mutex::new(0)),
            upload_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            posts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockConfig {
    pub fn auth_call_count(&self) -> usize {
        *self.auth_call_count.lock().unwrap()
    }

    pub fn upload_call_count(&self) -> usize {
        *self.upload_call_count.lock().unwrap()
    }

    pub fn post_call_count(&self) -> usize {
        *self.post_call_count.lock().unwrap()
    }

    pub fn posts(&self) -> Vec<MockPost> {
        self.posts.lock().unwrap().clone()
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform whose identity lookup fails
    pub fn identity_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            identity_succeeds: false,
            identity_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform that rejects posts
    pub fn post_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            post_succeeds: false,
            post_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform whose image uploads fail
    pub fn media_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            media_succeeds: false,
            media_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform without image support
    pub fn text_only(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            supports_media: false,
            ..Default::default()
        })
    }

    /// Create a mock platform with a delay
    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    /// Handle onto the shared counters and recorded posts
    pub fn config(&self) -> MockConfig {
        self.config.clone()
    }

    pub fn auth_call_count(&self) -> usize {
        self.config.auth_call_count()
    }

    pub fn post_call_count(&self) -> usize {
        self.config.post_call_count()
    }

    pub fn posts(&self) -> Vec<MockPost> {
        self.config.posts()
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured
    }

    async fn authenticate(&mut self) -> Result<()> {
        *self.config.auth_call_count.lock().unwrap() += 1;
        self.simulate_latency().await;

        if self.config.identity_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            let error_msg = self
                .config
                .identity_error
                .clone()
                .unwrap_or_else(|| "Mock identity lookup failed".to_string());
            Err(PlatformError::Identity(error_msg).into())
        }
    }

    fn supports_media(&self) -> bool {
        self.config.supports_media
    }

    async fn upload_media(&self, media: &MediaRef) -> Result<MediaHandle> {
        let count = {
            let mut count = self.config.upload_call_count.lock().unwrap();
            *count += 1;
            *count
        };

        if !self.config.supports_media {
            return Err(PlatformError::NotSupported(format!(
                "{} does not support images",
                self.config.name
            ))
            .into());
        }

        self.simulate_latency().await;

        if self.config.media_succeeds {
            Ok(MediaHandle(format!("{}:media-{}:{}", self.config.name, count, media)))
        } else {
            let error_msg = self
                .config
                .media_error
                .clone()
                .unwrap_or_else(|| "Mock upload failed".to_string());
            Err(PlatformError::Media(error_msg).into())
        }
    }

    async fn post(&self, text: &str, media: Option<&MediaHandle>) -> Result<String> {
        let count = {
            let mut count = self.config.post_call_count.lock().unwrap();
            *count += 1;
            *count
        };

        if !self.authenticated {
            return Err(PlatformError::Identity("Not authenticated".to_string()).into());
        }

        self.simulate_latency().await;

        if self.config.post_succeeds {
            self.config.posts.lock().unwrap().push(MockPost {
                text: text.to_string(),
                media: media.map(|m| m.as_str().to_string()),
            });
            Ok(format!("{}:post-{}", self.config.name, count))
        } else {
            let error_msg = self
                .config
                .post_error
                .clone()
                .unwrap_or_else(|| "Mock posting failed".to_string());
            Err(PlatformError::Posting(error_msg).into())
        }
    }
}
