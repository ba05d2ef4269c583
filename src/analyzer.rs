//! Site Metrics Analysis Engine
//!
//! [`SiteMetricsAnalyzer`] is the entry point for a batch run. It ties the
//! pipeline together:
//!
//! 1. **Parsing**: [`EventParser`] reads the input file and decodes each line
//! 2. **Routing**: [`BatchDriver`] deduplicates events and hands them to the
//!    per-site aggregators
//! 3. **Aggregation**: each [`crate::aggregator::SiteAggregator`] classifies its
//!    messages against its operator timeline
//! 4. **Reporting**: [`ReportEmitter`] writes one line per site
//!
//! ## Usage Example
//!
//! ```no_run
//! use site_metrics::{config::Config, SiteMetricsAnalyzer};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = SiteMetricsAnalyzer::new(Config::default());
//! analyzer.run(Path::new("events.jsonl"), false)?;
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::models::SiteReport;
use crate::parser::EventParser;
use crate::registry::{BatchDriver, BatchOutcome, RunContext};
use crate::report::ReportEmitter;
use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tracing::info_span;

pub struct SiteMetricsAnalyzer {
    config: Config,
}

impl Default for SiteMetricsAnalyzer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl SiteMetricsAnalyzer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn parser(&self) -> EventParser {
        EventParser::new(self.config.processing.on_malformed)
    }

    pub fn analyze_file(&self, path: &Path) -> Result<BatchOutcome> {
        let parser = self.parser();
        let driver = BatchDriver::new(RunContext::new());
        let span = info_span!(
            "batch",
            run_id = %driver.run_id(),
            input = %path.display(),
            on_malformed = %parser.policy()
        );
        let _enter = span.enter();

        parser.process_jsonl_file(path, driver)
    }

    pub fn analyze_str(&self, input: &str) -> Result<BatchOutcome> {
        let parser = self.parser();
        let driver = BatchDriver::new(RunContext::new());
        let span = info_span!("batch", run_id = %driver.run_id(), on_malformed = %parser.policy());
        let _enter = span.enter();

        parser.process_jsonl_str(input, driver)
    }

    /// Analyze `path` and return the per-site reports in `site_id` order.
    pub fn reports_for_file(&self, path: &Path) -> Result<Vec<SiteReport>> {
        let mut outcome = self.analyze_file(path)?;
        Ok(outcome.registry.reports())
    }

    pub fn run_to<W: Write>(&self, path: &Path, json_output: bool, out: &mut W) -> Result<()> {
        let reports = self.reports_for_file(path)?;
        ReportEmitter::new(json_output, self.config.output.json_pretty).emit(reports, out)
    }

    pub fn run(&self, path: &Path, json_output: bool) -> Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.run_to(path, json_output, &mut handle)
    }
}
