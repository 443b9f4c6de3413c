//! LinkedIn member posting through the UGC Posts API
//!
//! Posts are authored as `urn:li:person:{id}`, so the member id has to be
//! known before anything is published. It is looked up from the access token
//! unless supplied externally.
//!
//! Images use the asset upload protocol: register an upload, PUT the bytes
//! to the returned URL, then reference the asset URN from the post.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{PlatformError, Result};
use crate::platforms::{excerpt, map_request_error, non_empty_env, MediaHandle, Platform};
use crate::types::MediaRef;

pub const DEFAULT_API_BASE: &str = "https://api.linkedin.com";

pub const ACCESS_TOKEN_ENV: &str = "LINKEDIN_ACCESS_TOKEN";
pub const USER_ID_ENV: &str = "LINKEDIN_USER_ID";

const UPLOAD_MECHANISM: &str = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";

pub struct LinkedInClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
    user_id: Option<String>,
}

impl LinkedInClient {
    /// # Errors
    ///
    /// Returns `PlatformError::Network` if the HTTP client cannot be built.
    pub fn new(
        api_base: String,
        access_token: String,
        user_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
            user_id,
        })
    }

    /// Build a client from configuration and the environment.
    ///
    /// `LINKEDIN_ACCESS_TOKEN` is required. `LINKEDIN_USER_ID` (or
    /// `linkedin.user_id`) skips the identity lookup.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::MissingCredentials` if the token is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let access_token = non_empty_env(ACCESS_TOKEN_ENV).ok_or_else(|| {
            PlatformError::MissingCredentials(format!(
                "{} is not set. Export it or add it as a workflow secret.",
                ACCESS_TOKEN_ENV
            ))
        })?;

        let user_id = non_empty_env(USER_ID_ENV).or_else(|| {
            config
                .linkedin
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        });

        Self::new(
            config.linkedin.api_base.clone(),
            access_token,
            user_id,
            config.http_timeout()?,
        )
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn author_urn(&self) -> Result<String> {
        self.user_id
            .as_deref()
            .map(|id| format!("urn:li:person:{}", id))
            .ok_or_else(|| {
                PlatformError::Identity("LinkedIn member id has not been resolved".to_string())
                    .into()
            })
    }

    /// GET an identity endpoint and pull `field` from a 200 response
    async fn lookup_identity(&self, path: &str, field: &str) -> std::result::Result<String, String> {
        let response = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| format!("{} request failed: {}", path, e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            return Err(format!("{} returned {}: {}", path, status.as_u16(), excerpt(&body)));
        }

        serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| json.get(field).and_then(Value::as_str).map(str::to_string))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| format!("{} response has no '{}'", path, field))
    }

    async fn register_upload(&self, owner: &str) -> std::result::Result<(String, String), String> {
        let payload = json!({
            "registerUploadRequest": {
                "recipes": ["urn:li:digitalmediaRecipe:feedshare-image"],
                "owner": owner,
                "serviceRelationships": [{
                    "relationshipType": "OWNER",
                    "identifier": "urn:li:userGeneratedContent"
                }]
            }
        });

        let response = self
            .http
            .post(format!("{}/v2/assets?action=registerUpload", self.api_base))
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("register upload request failed: {}", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(format!("register upload returned {}: {}", status.as_u16(), excerpt(&body)));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|_| format!("register upload returned malformed JSON: {}", excerpt(&body)))?;
        let value = &json["value"];
        let upload_url = value["uploadMechanism"][UPLOAD_MECHANISM]["uploadUrl"]
            .as_str()
            .ok_or("register upload response has no uploadUrl")?;
        let asset = value["asset"]
            .as_str()
            .ok_or("register upload response has no asset")?;

        Ok((upload_url.to_string(), asset.to_string()))
    }

    async fn image_bytes(&self, media: &MediaRef) -> std::result::Result<Vec<u8>, String> {
        match media {
            MediaRef::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| format!("failed to read {}: {}", path.display(), e)),
            MediaRef::Url(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| format!("failed to download {}: {}", url, e))?;
                if !response.status().is_success() {
                    return Err(format!(
                        "failed to download {}: HTTP {}",
                        url,
                        response.status().as_u16()
                    ));
                }
                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| format!("failed to download {}: {}", url, e))
            }
        }
    }
}

#[async_trait]
impl Platform for LinkedInClient {
    fn name(&self) -> &str {
        "linkedin"
    }

    fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }

    async fn authenticate(&mut self) -> Result<()> {
        if let Some(id) = &self.user_id {
            debug!("Using configured LinkedIn member id {}", id);
            return Ok(());
        }

        let userinfo_failure = match self.lookup_identity("/v2/userinfo", "sub").await {
            Ok(id) => {
                info!("Resolved LinkedIn member id {}", id);
                self.user_id = Some(id);
                return Ok(());
            }
            Err(reason) => reason,
        };
        debug!("userinfo lookup failed ({}), trying /v2/me", userinfo_failure);

        match self.lookup_identity("/v2/me", "id").await {
            Ok(id) => {
                info!("Resolved LinkedIn member id {}", id);
                self.user_id = Some(id);
                Ok(())
            }
            Err(reason) => Err(PlatformError::Identity(format!(
                "Could not resolve LinkedIn member id: {}; {}",
                userinfo_failure, reason
            ))
            .into()),
        }
    }

    fn supports_media(&self) -> bool {
        true
    }

    async fn upload_media(&self, media: &MediaRef) -> Result<MediaHandle> {
        let owner = self
            .author_urn()
            .map_err(|e| PlatformError::Media(e.to_string()))?;

        let (upload_url, asset) = self
            .register_upload(&owner)
            .await
            .map_err(|reason| PlatformError::Media(format!("LinkedIn {}", reason)))?;

        let bytes = self
            .image_bytes(media)
            .await
            .map_err(|reason| PlatformError::Media(format!("LinkedIn image {}", reason)))?;

        let response = self
            .http
            .put(&upload_url)
            .bearer_auth(&self.access_token)
            .body(bytes)
            .send()
            .await
            .map_err(|e| PlatformError::Media(format!("LinkedIn image upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PlatformError::Media(format!(
                "LinkedIn image upload returned HTTP {}",
                response.status().as_u16()
            ))
            .into());
        }

        debug!("Uploaded {} as {}", media, asset);
        Ok(MediaHandle(asset))
    }

    async fn post(&self, text: &str, media: Option<&MediaHandle>) -> Result<String> {
        let author = self.author_urn()?;

        let mut share_content = json!({
            "shareCommentary": { "text": text },
            "shareMediaCategory": "NONE"
        });
        if let Some(handle) = media {
            share_content["shareMediaCategory"] = json!("IMAGE");
            share_content["media"] = json!([{ "status": "READY", "media": handle.as_str() }]);
        }

        let payload = json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": share_content
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        });

        let response = self
            .http
            .post(format!("{}/v2/ugcPosts", self.api_base))
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_request_error(e, "LinkedIn", "post"))?;

        let status = response.status();
        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        let json: Option<Value> = serde_json::from_str(&body).ok();

        if status == StatusCode::CREATED {
            let id = json
                .as_ref()
                .and_then(|j| j.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or(header_id)
                .unwrap_or_else(|| "unknown".to_string());
            return Ok(id);
        }

        let message = json
            .as_ref()
            .and_then(|j| j.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| excerpt(&body));
        Err(PlatformError::Posting(format!(
            "LinkedIn returned {}: {}",
            status.as_u16(),
            message
        ))
        .into())
    }
}
