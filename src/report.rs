//! Report output
//!
//! One line per site, ascending by `site_id`:
//!
//! ```text
//! <site_id>,messages=<chat>,emails=<email>,operators=<operators>,visitors=<visitors>
//! ```
//!
//! With JSON output enabled the same rows are written as a JSON array.

use crate::models::SiteReport;
use anyhow::{Context, Result};
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportEmitter {
    json_output: bool,
    json_pretty: bool,
}

impl ReportEmitter {
    pub fn new(json_output: bool, json_pretty: bool) -> Self {
        Self {
            json_output,
            json_pretty,
        }
    }

    /// Sort `reports` by site and write them to `out`.
    pub fn emit<W: Write>(&self, mut reports: Vec<SiteReport>, out: &mut W) -> Result<()> {
        reports.sort_by(|a, b| a.site_id.cmp(&b.site_id));

        if self.json_output {
            let rendered = if self.json_pretty {
                serde_json::to_string_pretty(&reports)
            } else {
                serde_json::to_string(&reports)
            }
            .context("Failed to serialize report")?;
            writeln!(out, "{}", rendered).context("Failed to write report")?;
        } else {
            for report in &reports {
                writeln!(out, "{}", report).context("Failed to write report")?;
            }
        }

        out.flush().context("Failed to flush report")?;
        Ok(())
    }

    pub fn render(&self, reports: Vec<SiteReport>) -> Result<String> {
        let mut buffer = Vec::new();
        self.emit(reports, &mut buffer)?;
        String::from_utf8(buffer).context("Report is not valid UTF-8")
    }
}
