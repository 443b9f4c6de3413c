//! Posted log persistence
//!
//! The posted log is the only state that survives between runs. It records
//! which catalog ids have gone out in the current cycle and when the last
//! successful publish happened.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{LogError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedLog {
    /// Ids published in the current cycle, in publish order
    #[serde(default)]
    pub posted_ids: Vec<String>,

    #[serde(default, with = "timestamp")]
    pub last_post_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_post_id: Option<String>,
}

impl PostedLog {
    pub fn contains(&self, id: &str) -> bool {
        self.posted_ids.iter().any(|posted| posted == id)
    }

    pub fn len(&self) -> usize {
        self.posted_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posted_ids.is_empty()
    }

    /// Record a confirmed publish of `id`
    pub fn record_publish(&mut self, id: &str, remote_id: &str, at: DateTime<Utc>) {
        if !self.contains(id) {
            self.posted_ids.push(id.to_string());
        }
        self.last_post_time = Some(at);
        self.last_post_id = Some(remote_id.to_string());
    }

    /// Start a new cycle. Last-post metadata is kept so interval gating
    /// still applies across the cycle boundary.
    pub fn clear_cycle(&mut self) {
        self.posted_ids.clear();
    }
}

/// File-backed store for the posted log
#[derive(Debug, Clone)]
pub struct PostedLogStore {
    path: PathBuf,
}

impl PostedLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log, treating a missing file as an empty log
    pub fn load(&self) -> Result<PostedLog> {
        if !self.path.exists() {
            debug!("No posted log at {}, starting empty", self.path.display());
            return Ok(PostedLog::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| LogError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        let log = serde_json::from_str(&content).map_err(|source| LogError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(log)
    }

    /// Persist the log atomically
    pub fn save(&self, log: &PostedLog) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(log).map_err(LogError::Serialize)?;
        data.push(b'\n');
        atomic_write(&self.path, &data).map_err(|source| LogError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        debug!(
            "Saved posted log ({} ids) to {}",
            log.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Overwrite the log with an empty one
    pub fn reset(&self) -> Result<PostedLog> {
        let log = PostedLog::default();
        self.save(&log)?;
        Ok(log)
    }
}

/// Write through a temp file in the target directory so readers never see a
/// partially written log.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// RFC 3339 on write; also accepts offset-less ISO-8601 (read as UTC) so
/// logs written by older posters keep loading.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
    }
}
