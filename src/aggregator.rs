//! Per-site aggregation
//!
//! A [`SiteAggregator`] owns every piece of state for one site: the operators
//! and visitors it has seen, the timestamps of accepted messages, and the
//! operator log from which the online/offline timeline is rebuilt.
//!
//! ## Classification
//!
//! The operator log maps each status-change timestamp to the change recorded
//! there, plus a baseline [`OperatorLogEntry::Pass`] at [`Timestamp::BASELINE`]
//! meaning "nobody online". Classification runs in two passes:
//!
//! 1. Forward over the log in ascending order, applying each change to the set
//!    of online operators and recording the resulting count. Each log key opens
//!    a half-open interval `[key, next_key)`; the last one ends at
//!    [`Timestamp::END_OF_TIME`].
//! 2. Backward over those intervals, counting messages in each one and adding
//!    them to `chat` when the interval had an operator online, `email`
//!    otherwise.
//!
//! Because the baseline sits below every real timestamp, every message falls
//! into exactly one interval. Messages are sorted once and each interval is
//! counted with two binary searches.
//!
//! Two status events at the same timestamp do not merge: the later one
//! replaces the earlier one in the log.

use crate::models::{
    Event, EventPayload, IngestOutcome, MessageCounts, OnlineInterval, OperatorLogEntry,
    SiteReport, StatusChange, Timestamp,
};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SiteAggregator {
    site_id: String,
    operators: HashSet<String>,
    visitors: HashSet<String>,
    messages: Vec<Timestamp>,
    operator_log: BTreeMap<Timestamp, OperatorLogEntry>,
    cached_counts: MessageCounts,
    dirty: bool,
}

impl SiteAggregator {
    pub fn new(site_id: impl Into<String>) -> Self {
        let mut operator_log = BTreeMap::new();
        operator_log.insert(Timestamp::BASELINE, OperatorLogEntry::Pass);

        Self {
            site_id: site_id.into(),
            operators: HashSet::new(),
            visitors: HashSet::new(),
            messages: Vec::new(),
            operator_log,
            cached_counts: MessageCounts::default(),
            dirty: true,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn ingest(&mut self, event: &Event) -> IngestOutcome {
        match &event.payload {
            EventPayload::Message { message } => self.ingest_message(event, message),
            EventPayload::Status { status } => self.ingest_status(event, status),
            EventPayload::Unrecognized { kind } => {
                warn!(
                    site_id = %self.site_id,
                    event_id = %event.id,
                    event_type = %kind,
                    "Unrecognized event type"
                );
                IngestOutcome::UnrecognizedType
            }
        }
    }

    fn ingest_message(&mut self, event: &Event, message: &str) -> IngestOutcome {
        self.visitors.insert(event.from.clone());

        if message.is_empty() {
            warn!(
                site_id = %self.site_id,
                event_id = %event.id,
                visitor = %event.from,
                "Discarding message with empty body"
            );
            return IngestOutcome::EmptyMessage;
        }

        self.messages.push(event.timestamp);
        self.invalidate();
        IngestOutcome::Message
    }

    fn ingest_status(&mut self, event: &Event, status: &StatusChange) -> IngestOutcome {
        let operator = event.from.clone();
        self.operators.insert(operator.clone());
        self.invalidate();

        let entry = match status {
            StatusChange::Online => OperatorLogEntry::Online(operator),
            StatusChange::Offline => OperatorLogEntry::Offline(operator),
            StatusChange::Unrecognized(value) => {
                warn!(
                    site_id = %self.site_id,
                    event_id = %event.id,
                    status = %value,
                    "Unknown status type"
                );
                return IngestOutcome::UnrecognizedStatus;
            }
        };

        if let Some(previous) = self.operator_log.insert(event.timestamp, entry) {
            debug!(
                site_id = %self.site_id,
                timestamp = %event.timestamp,
                replaced = ?previous,
                "Status change overwrote an entry at the same timestamp"
            );
        }
        IngestOutcome::Status
    }

    /// Marks the cached message counts as stale.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuilds the cached message counts from the current state.
    pub fn recompute(&mut self) {
        self.cached_counts = self.classify();
        self.dirty = false;
        debug!(
            site_id = %self.site_id,
            chat = self.cached_counts.chat,
            email = self.cached_counts.email,
            "Recomputed message counts"
        );
    }

    /// Cached message counts, recomputed first if any ingest happened since
    /// the last computation.
    pub fn counts(&mut self) -> MessageCounts {
        if self.dirty {
            self.recompute();
        }
        self.cached_counts
    }

    pub fn chat_count(&mut self) -> u64 {
        self.counts().chat
    }

    pub fn email_count(&mut self) -> u64 {
        self.counts().email
    }

    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    pub fn visitor_count(&self) -> usize {
        self.visitors.len()
    }

    /// Accepted message timestamps in ingestion order.
    pub fn message_timestamps(&self) -> &[Timestamp] {
        &self.messages
    }

    /// Forward pass: the operator timeline as consecutive half-open intervals.
    pub fn timeline(&self) -> Vec<OnlineInterval> {
        let mut online: HashSet<&str> = HashSet::new();
        let mut intervals = Vec::with_capacity(self.operator_log.len());
        let mut entries = self.operator_log.iter().peekable();

        while let Some((&start, entry)) = entries.next() {
            match entry {
                OperatorLogEntry::Online(operator) => {
                    online.insert(operator.as_str());
                }
                OperatorLogEntry::Offline(operator) => {
                    online.remove(operator.as_str());
                }
                OperatorLogEntry::Pass => {}
            }

            let end = entries
                .peek()
                .map(|(next, _)| **next)
                .unwrap_or(Timestamp::END_OF_TIME);

            intervals.push(OnlineInterval {
                start,
                end,
                online_operators: online.len(),
            });
        }

        intervals
    }

    /// Backward pass: classifies every accepted message against the timeline.
    /// Does not touch the cache.
    pub fn classify(&self) -> MessageCounts {
        let mut sorted = self.messages.clone();
        sorted.sort_unstable();

        let mut counts = MessageCounts::default();
        let mut window_end = Timestamp::END_OF_TIME;

        for interval in self.timeline().iter().rev() {
            let lower = sorted.partition_point(|ts| *ts < interval.start);
            let upper = sorted.partition_point(|ts| *ts < window_end);
            let in_interval = (upper - lower) as u64;

            if interval.is_staffed() {
                counts.chat += in_interval;
            } else {
                counts.email += in_interval;
            }

            window_end = interval.start;
        }

        counts
    }

    pub fn report(&mut self) -> SiteReport {
        let counts = self.counts();
        SiteReport {
            site_id: self.site_id().to_string(),
            messages: counts.chat,
            emails: counts.email,
            operators: self.operator_count(),
            visitors: self.visitor_count(),
        }
    }
}
