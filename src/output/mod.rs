//! Output module for run reports
//!
//! This module handles:
//! - Summarizing what a run crawled, extracted and stored
//! - Reporting the current size of the record store

pub mod stats;

pub use stats::{
    load_statistics, print_statistics, print_store_statistics, render_statistics, RunStatistics,
    StoreStatistics,
};
