//! Run orchestration
//!
//! A [`Runner`] wires the catalog, posted log, gate, formatter, media
//! selection and one platform together for a single process invocation.
//! The posted log is written only after a confirmed publish, or when a cycle
//! reset has to be made durable before publishing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{CyclecastError, PlatformError, Result};
use crate::formatter::Formatter;
use crate::gate::{IntervalGate, StartupJitter};
use crate::media::{MediaResolver, MediaSelector};
use crate::platforms::Platform;
use crate::posted_log::{PostedLog, PostedLogStore};
use crate::poster::publish;
use crate::selector::{posted, remaining, select_next, upcoming};
use crate::types::{PostRecord, Trigger};

/// A record that went out during this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedItem {
    pub record_id: String,
    pub category: String,
    pub text: String,
    pub remote_id: String,
    /// Image name chosen by the media policy, if any
    pub image: Option<String>,
    pub media_attached: bool,
    /// Why a requested image was dropped
    pub degraded: Option<String>,
    /// This publish started a new cycle
    pub cycle_reset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Posted(PostedItem),
    /// The interval gate refused; nothing was written
    NotYetTime { minutes_remaining: i64 },
    /// The catalog is empty
    NothingToPost,
}

/// A formatted post as it would go out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewItem {
    pub record_id: String,
    pub category: String,
    pub text: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingItem {
    pub id: String,
    pub category: String,
}

impl From<&PostRecord> for UpcomingItem {
    fn from(record: &PostRecord) -> Self {
        Self {
            id: record.id.clone(),
            category: record.category.clone(),
        }
    }
}

/// Snapshot of catalog progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub platform: String,
    pub log_path: String,
    pub total: usize,
    pub posted: usize,
    pub remaining: usize,
    /// Every record has gone out; the next run starts a new cycle
    pub cycle_complete: bool,
    pub last_post_time: Option<DateTime<Utc>>,
    pub last_post_id: Option<String>,
    pub upcoming: Vec<UpcomingItem>,
}

/// A record handed to the platform for later publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledItem {
    pub record_id: String,
    pub remote_id: String,
    pub publish_at: DateTime<Utc>,
}

pub struct Runner<R: Rng = StdRng> {
    config: Config,
    /// `None` for runners that only read state (preview, status, reset)
    platform: Option<Box<dyn Platform>>,
    rng: R,
    store: PostedLogStore,
    gate: IntervalGate,
    jitter: StartupJitter,
    formatter: Formatter,
    media: MediaSelector,
    resolver: MediaResolver,
}

impl Runner<StdRng> {
    /// Runner with an entropy-seeded random source
    pub fn from_config(config: Config, platform: Box<dyn Platform>) -> Result<Self> {
        Self::new(config, platform, StdRng::from_entropy())
    }

    /// Runner without a platform, for commands that never publish
    pub fn offline_from_config(config: Config) -> Result<Self> {
        Self::offline(config, StdRng::from_entropy())
    }
}

impl<R: Rng> Runner<R> {
    /// The posted log belongs to `config.defaults.platform`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the interval range is invalid.
    pub fn new(config: Config, platform: Box<dyn Platform>, rng: R) -> Result<Self> {
        let mut runner = Self::offline(config, rng)?;
        runner.platform = Some(platform);
        Ok(runner)
    }

    /// A runner that can preview, report and reset but not publish
    pub fn offline(config: Config, rng: R) -> Result<Self> {
        let store = PostedLogStore::new(config.log_path(config.defaults.platform));
        Ok(Self {
            gate: config.interval_gate()?,
            jitter: config.startup_jitter(),
            formatter: config.formatter(),
            media: config.media_selector(),
            resolver: config.media_resolver(),
            store,
            config,
            platform: None,
            rng,
        })
    }

    pub fn store(&self) -> &PostedLogStore {
        &self.store
    }

    pub fn platform(&self) -> Option<&dyn Platform> {
        self.platform.as_deref()
    }

    fn require_platform(&self) -> Result<()> {
        if self.platform.is_none() {
            return Err(PlatformError::MissingCredentials(format!(
                "no {} client available",
                self.config.defaults.platform
            ))
            .into());
        }
        Ok(())
    }

    fn load_catalog(&self) -> Result<Catalog> {
        let catalog = Catalog::load(&self.config.content_path())?;
        info!("Loaded {} posts from catalog", catalog.len());
        Ok(catalog)
    }

    /// Publish at most one record
    pub async fn run_once(&mut self, trigger: Trigger) -> Result<RunOutcome> {
        self.require_platform()?;
        let bypass = trigger.is_manual();
        if bypass {
            info!("Manual run: skipping startup jitter and interval gate");
        } else {
            let delay = self.jitter.draw(false, &mut self.rng);
            if !delay.is_zero() {
                info!("Waiting {}s before posting", delay.as_secs());
                sleep(delay).await;
            }
        }

        let catalog = self.load_catalog()?;
        let mut log = self.store.load()?;
        info!("Already posted this cycle: {}", log.len());

        let decision = self
            .gate
            .should_post_now(&log, bypass, Utc::now(), &mut self.rng);
        if !decision.allowed {
            info!(
                "Not time to post yet, {} minutes remaining",
                decision.minutes_remaining
            );
            return Ok(RunOutcome::NotYetTime {
                minutes_remaining: decision.minutes_remaining,
            });
        }

        let selection = select_next(&catalog, &mut log, 1);
        let Some(record) = selection.first() else {
            info!("Catalog is empty, nothing to post");
            return Ok(RunOutcome::NothingToPost);
        };
        if selection.cycle_reset {
            self.store.save(&log)?;
        }

        let text = self.formatter.format(record, &mut self.rng);
        let post_number = log.len() as u64 + 1;
        let image = self.media.select(post_number, &mut self.rng);
        let media = image.as_deref().and_then(|name| self.resolver.resolve(name));

        let Some(platform) = self.platform.as_deref_mut() else {
            return Err(PlatformError::MissingCredentials("no platform client".to_string()).into());
        };
        info!(
            "Posting [{}] {} to {}",
            record.category,
            record.id,
            platform.name()
        );

        let publication = match publish(platform, &text, media.as_ref()).await {
            Ok(publication) => publication,
            Err(e) => {
                error!("Failed to publish {}: {}", record.id, e);
                return Err(e);
            }
        };

        log.record_publish(&record.id, &publication.remote_id, Utc::now());
        self.store.save(&log)?;
        info!("Log updated, {} posted this cycle", log.len());

        Ok(RunOutcome::Posted(PostedItem {
            record_id: record.id.clone(),
            category: record.category.clone(),
            text,
            remote_id: publication.remote_id,
            image,
            media_attached: publication.media_attached,
            degraded: publication.degraded,
            cycle_reset: selection.cycle_reset,
        }))
    }

    /// Format the next `count` records without publishing or writing the log
    pub fn preview(&mut self, count: usize) -> Result<Vec<PreviewItem>> {
        let catalog = self.load_catalog()?;
        let mut log: PostedLog = self.store.load()?;
        let selection = select_next(&catalog, &mut log, count);
        let first_number = log.len() as u64 + 1;

        let items = selection
            .records
            .iter()
            .enumerate()
            .map(|(offset, record)| PreviewItem {
                record_id: record.id.clone(),
                category: record.category.clone(),
                text: self.formatter.format(record, &mut self.rng),
                image: self.media.select(first_number + offset as u64, &mut self.rng),
            })
            .collect();
        Ok(items)
    }

    /// Publish up to `count` records as manual runs, waiting `delay` between them.
    ///
    /// Stops at the first failure; records already published stay logged.
    pub async fn batch(&mut self, count: usize, delay: Duration) -> Result<Vec<RunOutcome>> {
        info!("Batch posting {} posts, {:?} apart", count, delay);
        let mut outcomes = Vec::with_capacity(count);

        for index in 0..count {
            info!("Batch post {}/{}", index + 1, count);
            let outcome = self.run_once(Trigger::Manual).await?;
            let exhausted = outcome == RunOutcome::NothingToPost;
            outcomes.push(outcome);
            if exhausted {
                break;
            }

            if index + 1 < count && !delay.is_zero() {
                info!("Waiting {} before the next post", humantime::format_duration(delay));
                sleep(delay).await;
            }
        }

        Ok(outcomes)
    }

    /// Progress report; never writes
    pub fn status(&self, count: usize) -> Result<Status> {
        let catalog = self.load_catalog()?;
        let log = self.store.load()?;

        let left = remaining(&catalog, &log);
        Ok(Status {
            platform: self.config.defaults.platform.to_string(),
            log_path: self.store.path().display().to_string(),
            total: catalog.len(),
            posted: posted(&catalog, &log),
            remaining: left,
            cycle_complete: !catalog.is_empty() && left == 0,
            last_post_time: log.last_post_time,
            last_post_id: log.last_post_id.clone(),
            upcoming: upcoming(&catalog, &log, count)
                .into_iter()
                .map(UpcomingItem::from)
                .collect(),
        })
    }

    /// Clear the posted log
    pub fn reset(&self) -> Result<()> {
        self.store.reset()?;
        info!("Posted log cleared at {}", self.store.path().display());
        Ok(())
    }

    /// Hand the next record to the platform for publication at `at`.
    ///
    /// The record is logged as published at `at`, so the interval gate
    /// counts from the scheduled time.
    pub async fn schedule_next(&mut self, at: DateTime<Utc>) -> Result<Option<ScheduledItem>> {
        self.require_platform()?;
        if at <= Utc::now() {
            return Err(CyclecastError::InvalidInput(format!(
                "Scheduled time {} is not in the future",
                at.to_rfc3339()
            )));
        }

        let catalog = self.load_catalog()?;
        let mut log = self.store.load()?;
        let selection = select_next(&catalog, &mut log, 1);
        let Some(record) = selection.first() else {
            info!("Catalog is empty, nothing to schedule");
            return Ok(None);
        };
        if selection.cycle_reset {
            self.store.save(&log)?;
        }

        let text = self.formatter.format(record, &mut self.rng);
        let Some(platform) = self.platform.as_deref_mut() else {
            return Err(PlatformError::MissingCredentials("no platform client".to_string()).into());
        };
        platform.authenticate().await?;
        let remote_id = match platform.schedule(&text, at).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to schedule {}: {}", record.id, e);
                return Err(e);
            }
        };

        log.record_publish(&record.id, &remote_id, at);
        self.store.save(&log)?;
        info!("Scheduled {} for {}", record.id, at.to_rfc3339());

        Ok(Some(ScheduledItem {
            record_id: record.id.clone(),
            remote_id,
            publish_at: at,
        }))
    }
}
