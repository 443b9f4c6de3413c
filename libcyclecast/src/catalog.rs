//! Content catalog loading
//!
//! The catalog is a CSV file with one row per pre-written post. It is read
//! once per run and never modified.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{ContentError, Result};
use crate::types::PostRecord;

/// Columns every content file must provide
pub const REQUIRED_COLUMNS: [&str; 5] = ["id", "pillar", "content", "hashtags", "cta"];

/// Ordered, read-only list of post records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<PostRecord>,
}

impl Catalog {
    /// Load the catalog from a CSV file
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the file cannot be read, a required column is
    /// missing, a row is malformed, or ids are empty or duplicated.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| ContentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_reader(file)?;
        debug!("Loaded {} posts from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse a catalog from any CSV source
    ///
    /// Header names are trimmed; field values are kept verbatim.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader.headers().map_err(ContentError::Malformed)?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ContentError::MissingColumn(column.to_string()).into());
            }
        }

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row.map_err(ContentError::Malformed)?;
            let record: PostRecord = row
                .deserialize(Some(&headers))
                .map_err(ContentError::Malformed)?;
            if record.id.trim().is_empty() {
                let line = row.position().map_or(0, |p| p.line());
                return Err(ContentError::EmptyId { line }.into());
            }
            records.push(record);
        }

        Self::from_records(records)
    }

    /// Build a catalog from records already in memory
    ///
    /// # Errors
    ///
    /// Returns `ContentError::DuplicateId` if two records share an id.
    pub fn from_records(records: Vec<PostRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id.as_str()) {
                return Err(ContentError::DuplicateId(record.id.clone()).into());
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

}
