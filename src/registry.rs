//! Site registry and batch driver
//!
//! The driver makes one forward pass over decoded events. For each event it
//! drops repeats through the run's [`MessageDeduplicator`], finds or creates
//! the [`SiteAggregator`] for the event's site, and ingests the event there.
//!
//! All run-scoped state lives in a [`RunContext`] built at the start of the
//! batch. Sites are kept in a `BTreeMap`, so iteration is already in ascending
//! `site_id` order.
//!
//! With the `parallel` feature, [`SiteRegistry::reports`] recomputes sites on
//! a rayon pool. Routing and dedup still happen in the single-threaded pass
//! before that, and each aggregator is handed to exactly one worker.

use crate::aggregator::SiteAggregator;
use crate::dedup::MessageDeduplicator;
use crate::error::DecodeError;
use crate::models::{Event, IngestOutcome, SiteReport};
use crate::parser::JsonlProcessor;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Input lines that decoded into an event.
    pub lines_decoded: usize,
    /// Events handed to the driver, from a file or directly.
    pub events_seen: usize,
    pub malformed_skipped: usize,
    pub duplicates_dropped: usize,
    pub empty_messages: usize,
    pub unrecognized_statuses: usize,
    pub unrecognized_types: usize,
    pub sites: usize,
}

/// State scoped to one batch run.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    dedup: MessageDeduplicator,
    stats: RunStats,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            dedup: MessageDeduplicator::new(),
            stats: RunStats::default(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn dedup(&self) -> &MessageDeduplicator {
        &self.dedup
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}

#[derive(Debug, Default)]
pub struct SiteRegistry {
    sites: BTreeMap<String, SiteAggregator>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one event to its site. Returns `None` when the id was already seen.
    pub fn route(&mut self, event: Event, ctx: &mut RunContext) -> Option<IngestOutcome> {
        if !ctx.dedup.check_and_mark(&event.id) {
            ctx.stats.duplicates_dropped += 1;
            debug!(event_id = %event.id, "Skipping duplicate event");
            return None;
        }

        let site = self
            .sites
            .entry(event.site_id.clone())
            .or_insert_with(|| {
                debug!(site_id = %event.site_id, "Registering new site");
                SiteAggregator::new(event.site_id.clone())
            });

        let outcome = site.ingest(&event);
        match outcome {
            IngestOutcome::EmptyMessage => ctx.stats.empty_messages += 1,
            IngestOutcome::UnrecognizedStatus => ctx.stats.unrecognized_statuses += 1,
            IngestOutcome::UnrecognizedType => ctx.stats.unrecognized_types += 1,
            IngestOutcome::Message | IngestOutcome::Status => {}
        }
        ctx.stats.sites = self.sites.len();

        Some(outcome)
    }

    pub fn get(&self, site_id: &str) -> Option<&SiteAggregator> {
        self.sites.get(site_id)
    }

    pub fn get_mut(&mut self, site_id: &str) -> Option<&mut SiteAggregator> {
        self.sites.get_mut(site_id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn site_ids(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    /// Compute every site's report, in ascending `site_id` order.
    #[cfg(not(feature = "parallel"))]
    pub fn reports(&mut self) -> Vec<SiteReport> {
        self.sites.values_mut().map(SiteAggregator::report).collect()
    }

    /// Compute every site's report, in ascending `site_id` order.
    #[cfg(feature = "parallel")]
    pub fn reports(&mut self) -> Vec<SiteReport> {
        use rayon::prelude::*;

        let mut reports: Vec<SiteReport> = self
            .sites
            .par_iter_mut()
            .map(|(_, site)| site.report())
            .collect();
        reports.sort_by(|a, b| a.site_id.cmp(&b.site_id));
        reports
    }
}

/// Result of a full batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub registry: SiteRegistry,
    pub stats: RunStats,
}

/// Drives decoded events into a [`SiteRegistry`].
#[derive(Debug, Default)]
pub struct BatchDriver {
    ctx: RunContext,
    registry: SiteRegistry,
}

impl BatchDriver {
    pub fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            registry: SiteRegistry::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.ctx.run_id
    }

    pub fn ingest(&mut self, event: Event) -> Option<IngestOutcome> {
        self.ctx.stats.events_seen += 1;
        self.registry.route(event, &mut self.ctx)
    }

    pub fn ingest_all<I>(mut self, events: I) -> BatchOutcome
    where
        I: IntoIterator<Item = Event>,
    {
        for event in events {
            self.ingest(event);
        }
        self.into_outcome()
    }

    fn into_outcome(self) -> BatchOutcome {
        let stats = self.ctx.stats;

        info!(
            run_id = %self.ctx.run_id,
            lines_decoded = stats.lines_decoded,
            events_seen = stats.events_seen,
            duplicates_dropped = stats.duplicates_dropped,
            empty_messages = stats.empty_messages,
            unrecognized_statuses = stats.unrecognized_statuses,
            unrecognized_types = stats.unrecognized_types,
            sites = stats.sites,
            "Batch ingested"
        );
        if stats.malformed_skipped > 0 {
            warn!(
                run_id = %self.ctx.run_id,
                malformed_skipped = stats.malformed_skipped,
                "Malformed lines were skipped"
            );
        }

        BatchOutcome {
            run_id: self.ctx.run_id,
            registry: self.registry,
            stats,
        }
    }
}

impl JsonlProcessor for BatchDriver {
    type Output = BatchOutcome;

    fn process_entry(&mut self, event: Event, _line_number: usize) -> Result<()> {
        self.ctx.stats.lines_decoded += 1;
        self.ingest(event);
        Ok(())
    }

    fn record_malformed(&mut self, _line_number: usize, _error: &DecodeError) {
        self.ctx.stats.malformed_skipped += 1;
    }

    fn finalize(self) -> Result<Self::Output> {
        Ok(self.into_outcome())
    }
}
