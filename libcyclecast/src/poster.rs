//! Publishing a formatted post through a platform
//!
//! [`publish`] is the one place where an image upload failure is turned into
//! a text-only post instead of an aborted run.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{CyclecastError, PlatformError, Result};
use crate::platforms::{
    facebook::FacebookClient, linkedin::LinkedInClient, Platform, PlatformKind,
};
use crate::types::{MediaRef, Publication};

/// Create the platform client for `kind` from configuration and environment
///
/// # Errors
///
/// Returns `PlatformError::MissingCredentials` if the platform's credentials
/// are not set in the environment.
pub fn create_platform(kind: PlatformKind, config: &Config) -> Result<Box<dyn Platform>> {
    info!("Creating {} platform client", kind);
    let platform: Box<dyn Platform> = match kind {
        PlatformKind::Facebook => Box::new(FacebookClient::from_config(config)?),
        PlatformKind::LinkedIn => Box::new(LinkedInClient::from_config(config)?),
    };
    ensure_configured(platform)
}

/// Reject a client whose credentials are incomplete
pub fn ensure_configured(platform: Box<dyn Platform>) -> Result<Box<dyn Platform>> {
    if !platform.is_configured() {
        return Err(PlatformError::MissingCredentials(format!(
            "{} credentials are incomplete",
            platform.name()
        ))
        .into());
    }
    Ok(platform)
}

/// Resolve identity, attach `media` if possible, and submit `text`.
///
/// Image failures (and platforms without image support) are logged and the
/// post goes out text-only, with the reason recorded in
/// [`Publication::degraded`]. Identity and submission failures propagate.
pub async fn publish(
    platform: &mut dyn Platform,
    text: &str,
    media: Option<&MediaRef>,
) -> Result<Publication> {
    platform.authenticate().await?;

    let mut degraded = None;
    let handle = match media {
        None => None,
        Some(media) if !platform.supports_media() => {
            let reason = format!("{} does not support images", platform.name());
            warn!("{}; posting {} text-only", reason, media);
            degraded = Some(reason);
            None
        }
        Some(media) => match platform.upload_media(media).await {
            Ok(handle) => {
                debug!("Attached {} to {} post", media, platform.name());
                Some(handle)
            }
            Err(CyclecastError::Platform(e)) if e.is_recoverable() => {
                warn!("Image {} could not be attached ({}); posting text-only", media, e);
                degraded = Some(e.to_string());
                None
            }
            Err(e) => return Err(e),
        },
    };

    let remote_id = platform.post(text, handle.as_ref()).await?;
    info!("Published to {} as {}", platform.name(), remote_id);

    Ok(Publication {
        remote_id,
        media_attached: handle.is_some(),
        degraded,
    })
}
