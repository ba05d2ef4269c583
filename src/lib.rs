//! Site Metrics Library
//!
//! Computes per-site live-chat versus email routing metrics from a batch of
//! newline-delimited JSON events. Each event is either a visitor message or an
//! operator status change (`online` / `offline`). A message counts as a chat
//! when at least one operator of its site was online at the message's
//! timestamp, and as an email otherwise.
//!
//! ## Architecture Overview
//!
//! - [`models`] - Events, timestamps, timeline intervals, and report rows
//! - [`parser`] - Line decoding and the [`parser::JsonlProcessor`] trait
//! - [`dedup`] - Run-scoped event id deduplication
//! - [`aggregator`] - Per-site state and the chat/email classification
//! - [`registry`] - Event routing, run context, and run statistics
//! - [`report`] - Report formatting
//! - [`analyzer`] - End-to-end orchestration
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//!
//! ## Main Entry Point
//!
//! ```no_run
//! use site_metrics::SiteMetricsAnalyzer;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = SiteMetricsAnalyzer::default();
//! for report in analyzer.reports_for_file(Path::new("events.jsonl"))? {
//!     println!("{}", report);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod registry;
pub mod report;

pub use aggregator::SiteAggregator;
pub use analyzer::SiteMetricsAnalyzer;
pub use models::*;
