//! Next-post selection
//!
//! Records go out in catalog order. Once every record has been posted the
//! cycle restarts from the top.

use tracing::info;

use crate::catalog::Catalog;
use crate::posted_log::PostedLog;
use crate::types::PostRecord;

/// Records chosen for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    pub records: Vec<&'a PostRecord>,
    /// The catalog was exhausted and the log's id list was cleared.
    /// Callers must persist the log before publishing.
    pub cycle_reset: bool,
}

impl<'a> Selection<'a> {
    pub fn first(&self) -> Option<&'a PostRecord> {
        self.records.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pick up to `count` unpublished records in catalog order, resetting the
/// cycle on `log` when nothing is left.
pub fn select_next<'a>(catalog: &'a Catalog, log: &mut PostedLog, count: usize) -> Selection<'a> {
    if count == 0 || catalog.is_empty() {
        return Selection {
            records: Vec::new(),
            cycle_reset: false,
        };
    }

    let mut records = unposted(catalog, log, count);
    let mut cycle_reset = false;

    if records.is_empty() {
        info!(
            "All {} posts have been published, starting a fresh cycle",
            catalog.len()
        );
        log.clear_cycle();
        cycle_reset = true;
        records = unposted(catalog, log, count);
    }

    Selection {
        records,
        cycle_reset,
    }
}

/// The next `count` records in the order runs will post them. Once the
/// cycle is exhausted this is the start of the next cycle. `log` is not
/// modified.
pub fn upcoming<'a>(catalog: &'a Catalog, log: &PostedLog, count: usize) -> Vec<&'a PostRecord> {
    let records = unposted(catalog, log, count);
    if records.is_empty() {
        return catalog.records().iter().take(count).collect();
    }
    records
}

/// Number of catalog records published in this cycle; ids no longer in the
/// catalog are not counted
pub fn posted(catalog: &Catalog, log: &PostedLog) -> usize {
    catalog
        .records()
        .iter()
        .filter(|r| log.contains(&r.id))
        .count()
}

/// Number of catalog records not yet published in this cycle
pub fn remaining(catalog: &Catalog, log: &PostedLog) -> usize {
    catalog
        .records()
        .iter()
        .filter(|r| !log.contains(&r.id))
        .count()
}

fn unposted<'a>(catalog: &'a Catalog, log: &PostedLog, count: usize) -> Vec<&'a PostRecord> {
    catalog
        .records()
        .iter()
        .filter(|r| !log.contains(&r.id))
        .take(count)
        .collect()
}
