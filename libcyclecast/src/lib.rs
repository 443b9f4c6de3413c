//! Cyclecast - scheduled posting from a fixed catalog
//!
//! This library reads a catalog of pre-written posts, tracks which have gone
//! out, picks the next one (restarting the cycle once the catalog is
//! exhausted), varies its layout, and publishes it to Facebook or LinkedIn.

pub mod catalog;
pub mod config;
pub mod error;
pub mod formatter;
pub mod gate;
pub mod logging;
pub mod media;
pub mod platforms;
pub mod posted_log;
pub mod poster;
pub mod runner;
pub mod selector;
pub mod types;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::Config;
pub use error::{CyclecastError, Result};
pub use platforms::{Platform, PlatformKind};
pub use posted_log::{PostedLog, PostedLogStore};
pub use runner::{RunOutcome, Runner, Status};
pub use types::{MediaRef, PostRecord, Publication, Trigger};
