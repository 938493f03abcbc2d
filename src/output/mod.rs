//! Output module for reporting on crawl results
//!
//! This module handles:
//! - Loading catalogue and frontier statistics from storage
//! - Printing them for the `--stats` mode

pub mod stats;

pub use stats::{format_timestamp, load_statistics, print_statistics, CrawlStatistics};
