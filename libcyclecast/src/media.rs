//! Image selection for posts
//!
//! A featured image shows up on a fixed cadence (every Nth post). Two
//! policies decide what happens around it; see [`MediaPolicy`].

use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::types::MediaRef;

pub const DEFAULT_FEATURED_EVERY: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MediaPolicy {
    /// Text-only posts
    #[default]
    None,
    /// Every `every`th post uses `featured`; the rest draw at random from `rotation`
    Featured {
        every: u32,
        featured: String,
        rotation: Vec<String>,
    },
    /// Every `every`th post steps through `pool` in order; other posts get no image
    RoundRobin { every: u32, pool: Vec<String> },
}

impl MediaPolicy {
    /// Round-robin pool made of the rotation images followed by the featured one
    pub fn round_robin(every: u32, rotation: Vec<String>, featured: Option<String>) -> Self {
        let mut pool = rotation;
        pool.extend(featured);
        MediaPolicy::RoundRobin { every, pool }
    }
}

/// Picks an image name for a post sequence number (1-based)
#[derive(Debug, Clone, Default)]
pub struct MediaSelector {
    policy: MediaPolicy,
}

impl MediaSelector {
    pub fn new(policy: MediaPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MediaPolicy {
        &self.policy
    }

    pub fn select<R: Rng + ?Sized>(&self, post_number: u64, rng: &mut R) -> Option<String> {
        match &self.policy {
            MediaPolicy::None => None,
            MediaPolicy::Featured {
                every,
                featured,
                rotation,
            } => {
                if is_cadence(post_number, *every) {
                    debug!("Post #{} uses featured image {}", post_number, featured);
                    return Some(featured.clone());
                }
                let image = rotation.choose(rng).cloned();
                if let Some(name) = &image {
                    debug!("Post #{} uses rotation image {}", post_number, name);
                }
                image
            }
            MediaPolicy::RoundRobin { every, pool } => {
                if pool.is_empty() || !is_cadence(post_number, *every) {
                    return None;
                }
                let every = u64::from((*every).max(1));
                let index = ((post_number / every) % pool.len() as u64) as usize;
                debug!(
                    "Post #{} uses pool image {} ({}/{})",
                    post_number,
                    pool[index],
                    index + 1,
                    pool.len()
                );
                Some(pool[index].clone())
            }
        }
    }
}

fn is_cadence(post_number: u64, every: u32) -> bool {
    post_number % u64::from(every.max(1)) == 0
}

/// Turns image names into something a platform can upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaResolver {
    base_url: Option<String>,
    base_dir: Option<PathBuf>,
}

impl MediaResolver {
    pub fn new(base_url: Option<String>, base_dir: Option<PathBuf>) -> Self {
        Self { base_url, base_dir }
    }

    /// Resolve `name`; a local file that does not exist resolves to `None`
    pub fn resolve(&self, name: &str) -> Option<MediaRef> {
        if name.starts_with("http://") || name.starts_with("https://") {
            return Some(MediaRef::Url(name.to_string()));
        }

        if let Some(base_url) = &self.base_url {
            let url = format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                name.trim_start_matches('/')
            );
            return Some(MediaRef::Url(url));
        }

        let path = match &self.base_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        };

        if path.is_file() {
            Some(MediaRef::Path(path))
        } else {
            warn!("Image {} not found, posting without it", path.display());
            None
        }
    }
}
