//! Facebook Page posting through the Graph API
//!
//! Text goes to `/{page_id}/feed`. Images are uploaded unpublished to
//! `/{page_id}/photos` first and then attached to the feed post, so a failed
//! upload can still fall back to a text-only post.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{PlatformError, Result};
use crate::platforms::{excerpt, map_request_error, non_empty_env, MediaHandle, Platform};
use crate::types::MediaRef;

pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v18.0";

pub const ACCESS_TOKEN_ENV: &str = "FB_PAGE_ACCESS_TOKEN";
pub const PAGE_ID_ENV: &str = "FB_PAGE_ID";

pub struct FacebookClient {
    http: reqwest::Client,
    api_base: String,
    api_version: String,
    page_id: String,
    access_token: String,
}

impl FacebookClient {
    /// # Errors
    ///
    /// Returns `PlatformError::Network` if the HTTP client cannot be built.
    pub fn new(
        api_base: String,
        api_version: String,
        page_id: String,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_version,
            page_id,
            access_token,
        })
    }

    /// Build a client from configuration and the environment.
    ///
    /// The access token comes from `FB_PAGE_ACCESS_TOKEN`. The page id comes
    /// from `FB_PAGE_ID`, falling back to `facebook.page_id` in the config.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::MissingCredentials` if either value is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let access_token = non_empty_env(ACCESS_TOKEN_ENV).ok_or_else(|| {
            PlatformError::MissingCredentials(format!(
                "{} is not set. Export it or add it as a workflow secret.",
                ACCESS_TOKEN_ENV
            ))
        })?;

        let page_id = non_empty_env(PAGE_ID_ENV)
            .or_else(|| config.facebook.page_id.clone().filter(|id| !id.trim().is_empty()))
            .ok_or_else(|| {
                PlatformError::MissingCredentials(format!(
                    "{} is not set and facebook.page_id is not configured",
                    PAGE_ID_ENV
                ))
            })?;

        Self::new(
            config.facebook.api_base.clone(),
            config.facebook.api_version.clone(),
            page_id,
            access_token,
            config.http_timeout()?,
        )
    }

    fn endpoint(&self, edge: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.api_base, self.api_version, self.page_id, edge
        )
    }

    async fn submit_feed(&self, params: Vec<(&str, String)>, context: &str) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("feed"))
            .form(&params)
            .send()
            .await
            .map_err(|e| map_request_error(e, "Facebook", context))?;

        read_graph_id(response)
            .await
            .map_err(|message| PlatformError::Posting(format!("Facebook {}: {}", context, message)).into())
    }
}

#[async_trait]
impl Platform for FacebookClient {
    fn name(&self) -> &str {
        "facebook"
    }

    fn is_configured(&self) -> bool {
        !self.access_token.is_empty() && !self.page_id.is_empty()
    }

    fn supports_media(&self) -> bool {
        true
    }

    async fn upload_media(&self, media: &MediaRef) -> Result<MediaHandle> {
        let request = self.http.post(self.endpoint("photos"));

        let request = match media {
            MediaRef::Url(url) => request.form(&[
                ("url", url.as_str()),
                ("published", "false"),
                ("access_token", self.access_token.as_str()),
            ]),
            MediaRef::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    PlatformError::Media(format!("Failed to read image {}: {}", path.display(), e))
                })?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "image".to_string());
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(mime_for(path))
                    .map_err(|e| PlatformError::Media(format!("Invalid image type: {}", e)))?;
                let form = Form::new()
                    .text("published", "false")
                    .text("access_token", self.access_token.clone())
                    .part("source", part);
                request.multipart(form)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Media(format!("Facebook photo upload failed: {}", e)))?;

        let photo_id = read_graph_id(response)
            .await
            .map_err(|message| PlatformError::Media(format!("Facebook photo upload: {}", message)))?;

        debug!("Uploaded unpublished photo {} for {}", photo_id, media);
        Ok(MediaHandle(photo_id))
    }

    async fn post(&self, text: &str, media: Option<&MediaHandle>) -> Result<String> {
        let mut params = vec![
            ("message", text.to_string()),
            ("access_token", self.access_token.clone()),
        ];
        if let Some(handle) = media {
            params.push((
                "attached_media[0]",
                serde_json::json!({ "media_fbid": handle.as_str() }).to_string(),
            ));
        }

        self.submit_feed(params, "post").await
    }

    async fn schedule(&self, text: &str, at: DateTime<Utc>) -> Result<String> {
        let params = vec![
            ("message", text.to_string()),
            ("published", "false".to_string()),
            ("scheduled_publish_time", at.timestamp().to_string()),
            ("access_token", self.access_token.clone()),
        ];

        self.submit_feed(params, "schedule").await
    }
}

/// Extract `id` from a Graph API response, or the API's error message
async fn read_graph_id(response: reqwest::Response) -> std::result::Result<String, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("failed to read response: {}", e))?;

    let json: Value = serde_json::from_str(&body).map_err(|_| {
        format!("unexpected response (HTTP {}): {}", status.as_u16(), excerpt(&body))
    })?;

    if let Some(id) = json.get("id").and_then(Value::as_str) {
        return Ok(id.to_string());
    }

    Err(json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string())
}

fn mime_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}
