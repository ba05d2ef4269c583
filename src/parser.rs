//! Event decoding and JSONL processing
//!
//! Each non-blank input line is one JSON object:
//!
//! ```json
//! {"id": "...", "site_id": "...", "type": "message", "from": "...",
//!  "timestamp": 1465997960, "data": {"message": "..."}}
//! ```
//!
//! Decoding validates the envelope and the payload field for the known event
//! types up front. An unknown `type` or an unknown `status` value still decodes;
//! the aggregator decides what to do with it.
//!
//! Lines are fed to a [`JsonlProcessor`], so callers choose whether to collect
//! events, route them straight into aggregators, or something else.

use crate::config::MalformedPolicy;
use crate::error::{AnalysisError, DecodeError};
use crate::models::{Event, EventPayload, StatusChange, Timestamp};
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Line-by-line consumer of decoded events.
pub trait JsonlProcessor {
    type Output;

    fn process_entry(&mut self, event: Event, line_number: usize) -> Result<()>;

    /// Called for lines that failed to decode when the policy is to skip them.
    fn record_malformed(&mut self, _line_number: usize, _error: &DecodeError) {}

    fn finalize(self) -> Result<Self::Output>;
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    site_id: String,
    #[serde(rename = "type")]
    kind: String,
    from: String,
    timestamp: Timestamp,
    data: Map<String, Value>,
}

/// Decode one input line into an [`Event`].
pub fn decode_event(line: &str) -> Result<Event, DecodeError> {
    let raw: RawEvent = serde_json::from_str(line)?;

    let payload = match raw.kind.as_str() {
        "message" => EventPayload::Message {
            message: payload_str(&raw, "message")?.to_string(),
        },
        "status" => EventPayload::Status {
            status: StatusChange::from(payload_str(&raw, "status")?),
        },
        _ => EventPayload::Unrecognized {
            kind: raw.kind.clone(),
        },
    };

    Ok(Event {
        id: raw.id,
        site_id: raw.site_id,
        from: raw.from,
        timestamp: raw.timestamp,
        payload,
    })
}

fn payload_str<'a>(raw: &'a RawEvent, field: &'static str) -> Result<&'a str, DecodeError> {
    raw.data
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MissingPayload {
            id: raw.id.clone(),
            kind: raw.kind.clone(),
            field,
        })
}

pub struct EventParser {
    on_malformed: MalformedPolicy,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new(MalformedPolicy::default())
    }
}

impl EventParser {
    pub fn new(on_malformed: MalformedPolicy) -> Self {
        Self { on_malformed }
    }

    pub fn policy(&self) -> MalformedPolicy {
        self.on_malformed
    }

    pub fn parse_jsonl_file(&self, file_path: &Path) -> Result<Vec<Event>> {
        self.process_jsonl_file(file_path, CollectorProcessor::new())
    }

    /// Read the whole file and feed every line through `processor`.
    pub fn process_jsonl_file<P: JsonlProcessor>(
        &self,
        file_path: &Path,
        processor: P,
    ) -> Result<P::Output> {
        let input = fs::read_to_string(file_path).map_err(|source| AnalysisError::FileAccess {
            path: file_path.to_path_buf(),
            source,
        })?;

        debug!(
            path = %file_path.display(),
            bytes = input.len(),
            "Read input file"
        );

        self.process_jsonl_str(&input, processor)
    }

    pub fn process_jsonl_str<P: JsonlProcessor>(
        &self,
        input: &str,
        mut processor: P,
    ) -> Result<P::Output> {
        for (index, line) in input.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match decode_event(line) {
                Ok(event) => processor.process_entry(event, line_number)?,
                Err(error) => match self.on_malformed {
                    MalformedPolicy::Abort => {
                        return Err(AnalysisError::MalformedLine {
                            line_number,
                            source: error,
                        }
                        .into());
                    }
                    MalformedPolicy::Skip => {
                        warn!(line_number, error = %error, "Skipping malformed event line");
                        processor.record_malformed(line_number, &error);
                    }
                },
            }
        }

        processor.finalize()
    }
}

/// Collects every decoded event into a `Vec`.
#[derive(Default)]
pub struct CollectorProcessor {
    entries: Vec<Event>,
    malformed_lines: Vec<usize>,
}

impl CollectorProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JsonlProcessor for CollectorProcessor {
    type Output = Vec<Event>;

    fn process_entry(&mut self, event: Event, _line_number: usize) -> Result<()> {
        self.entries.push(event);
        Ok(())
    }

    fn record_malformed(&mut self, line_number: usize, _error: &DecodeError) {
        self.malformed_lines.push(line_number);
    }

    fn finalize(self) -> Result<Self::Output> {
        if !self.malformed_lines.is_empty() {
            debug!(lines = ?self.malformed_lines, "Collector skipped malformed lines");
        }
        Ok(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message() {
        let event = decode_event(
            r#"{"id":"1","site_id":"s","type":"message","from":"v","timestamp":5,"data":{"message":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(event, Event::message("1", "s", "v", 5, "hi"));
        assert_eq!(event.kind(), "message");
    }

    #[test]
    fn test_decode_status_variants() {
        let online = decode_event(
            r#"{"id":"1","site_id":"s","type":"status","from":"op","timestamp":5,"data":{"status":"online"}}"#,
        )
        .unwrap();
        assert_eq!(
            online.payload,
            EventPayload::Status {
                status: StatusChange::Online
            }
        );

        let odd = decode_event(
            r#"{"id":"2","site_id":"s","type":"status","from":"op","timestamp":5,"data":{"status":"busy"}}"#,
        )
        .unwrap();
        assert_eq!(
            odd.payload,
            EventPayload::Status {
                status: StatusChange::Unrecognized("busy".to_string())
            }
        );
    }

    #[test]
    fn test_decode_unknown_type_is_not_an_error() {
        let event = decode_event(
            r#"{"id":"1","site_id":"s","type":"typing","from":"v","timestamp":5,"data":{}}"#,
        )
        .unwrap();
        assert_eq!(event.kind(), "typing");
    }

    #[test]
    fn test_decode_rejects_missing_payload() {
        let err = decode_event(
            r#"{"id":"1","site_id":"s","type":"message","from":"v","timestamp":5,"data":{}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingPayload { field: "message", .. }
        ));
    }

    #[test]
    fn test_decode_rejects_mistyped_envelope() {
        let err = decode_event(
            r#"{"id":"1","site_id":"s","type":"message","from":"v","timestamp":"noon","data":{"message":"x"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));

        assert!(decode_event(r#"{"id":"1"}"#).is_err());
        assert!(decode_event("not json").is_err());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let input = "\n\n{\"id\":\"1\",\"site_id\":\"s\",\"type\":\"message\",\"from\":\"v\",\"timestamp\":1,\"data\":{\"message\":\"a\"}}\n\n";
        let events = EventParser::default()
            .process_jsonl_str(input, CollectorProcessor::new())
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_abort_policy_reports_line_number() {
        let input = "{\"id\":\"1\",\"site_id\":\"s\",\"type\":\"message\",\"from\":\"v\",\"timestamp\":1,\"data\":{\"message\":\"a\"}}\n{broken\n";
        let err = EventParser::new(MalformedPolicy::Abort)
            .process_jsonl_str(input, CollectorProcessor::new())
            .unwrap_err();
        match err.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::MalformedLine { line_number, .. }) => assert_eq!(*line_number, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
