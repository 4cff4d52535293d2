//! The data export boundary.
//!
//! The kernel computes per-period metric reports and hands them off; it owns
//! no file format or rendering. Export happens after the consistency sweep,
//! in a step that does not mutate ledger state.

use std::io::Write;

use contracts::MetricReport;

pub trait MetricExporter {
    fn export_period(&mut self, report: &MetricReport);
}

/// Writes one JSON document per period, one per line.
#[derive(Debug)]
pub struct JsonLinesExporter<W: Write> {
    out: W,
    last_error: Option<String>,
}

impl<W: Write> JsonLinesExporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_error: None,
        }
    }

    /// The most recent write/serialization failure, if any. Export errors
    /// never abort the simulation; the caller inspects this after the run.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MetricExporter for JsonLinesExporter<W> {
    fn export_period(&mut self, report: &MetricReport) {
        match serde_json::to_string(report) {
            Ok(line) => {
                if let Err(err) = writeln!(self.out, "{}", line) {
                    self.last_error = Some(err.to_string());
                }
            }
            Err(err) => self.last_error = Some(err.to_string()),
        }
    }
}

/// Buffers reports in memory; the test-suite exporter.
#[derive(Debug, Default)]
pub struct CollectingExporter {
    pub reports: Vec<MetricReport>,
}

impl CollectingExporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricExporter for CollectingExporter {
    fn export_period(&mut self, report: &MetricReport) {
        self.reports.push(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{LedgerTotals, SCHEMA_VERSION_V1};
    use std::collections::BTreeMap;

    fn report(period: u64) -> MetricReport {
        MetricReport {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_x".to_string(),
            period,
            sectors: BTreeMap::new(),
            totals: LedgerTotals::default(),
        }
    }

    #[test]
    fn json_lines_exporter_writes_one_line_per_period() {
        let mut exporter = JsonLinesExporter::new(Vec::new());
        exporter.export_period(&report(0));
        exporter.export_period(&report(1));
        assert!(exporter.last_error().is_none());

        let raw = String::from_utf8(exporter.into_inner()).expect("utf8");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let decoded: MetricReport = serde_json::from_str(lines[1]).expect("valid json");
        assert_eq!(decoded.period, 1);
    }

    #[test]
    fn collecting_exporter_keeps_every_report() {
        let mut exporter = CollectingExporter::new();
        exporter.export_period(&report(0));
        exporter.export_period(&report(1));
        assert_eq!(exporter.reports.len(), 2);
        assert_eq!(exporter.reports[0].period, 0);
    }
}
