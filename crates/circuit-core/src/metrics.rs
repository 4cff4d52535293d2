//! Per-period metric collection.
//!
//! Each sector declares its metric names once, at registration; the schema
//! resolves name to slot index at initialization and sectors write by slot
//! from then on. A slot's index is its position in the sector's declaration
//! order, so there is no runtime name lookup on the hot path.

use std::collections::BTreeMap;

/// Metric slot layout, frozen at circuit initialization.
#[derive(Debug, Clone, Default)]
pub struct MetricSchema {
    by_sector: BTreeMap<String, Vec<String>>,
}

impl MetricSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sector's declared metric names. Declaration order is the
    /// slot order.
    pub fn declare(&mut self, sector: &str, names: Vec<String>) {
        self.by_sector.insert(sector.to_string(), names);
    }

    /// Slot index for a metric name, if the sector declared it.
    pub fn slot(&self, sector: &str, name: &str) -> Option<usize> {
        self.by_sector
            .get(sector)?
            .iter()
            .position(|declared| declared == name)
    }

    /// A zeroed writer over the sector's declared slots.
    pub fn writer_for(&self, sector: &str) -> Option<MetricWriter<'_>> {
        self.by_sector.get(sector).map(|names| MetricWriter {
            names,
            values: vec![0; names.len()],
        })
    }

    pub fn sectors(&self) -> impl Iterator<Item = &str> {
        self.by_sector.keys().map(String::as_str)
    }
}

/// One period's metric values for one sector, indexed by resolved slot.
#[derive(Debug)]
pub struct MetricWriter<'a> {
    names: &'a [String],
    values: Vec<i64>,
}

impl MetricWriter<'_> {
    /// Write a value into a declared slot. Out-of-range slots are ignored
    /// rather than panicking mid-phase.
    pub fn set(&mut self, slot: usize, value: i64) {
        if let Some(cell) = self.values.get_mut(slot) {
            *cell = value;
        }
    }

    pub fn add(&mut self, slot: usize, delta: i64) {
        if let Some(cell) = self.values.get_mut(slot) {
            *cell += delta;
        }
    }

    /// Zip declared names with written values for the export report.
    pub fn finish(self) -> BTreeMap<String, i64> {
        self.names
            .iter()
            .cloned()
            .zip(self.values)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> MetricSchema {
        let mut schema = MetricSchema::new();
        schema.declare(
            "firms",
            vec!["wages_paid".to_string(), "loans_repaid".to_string()],
        );
        schema
    }

    #[test]
    fn slots_follow_declaration_order() {
        let schema = schema();
        assert_eq!(schema.slot("firms", "wages_paid"), Some(0));
        assert_eq!(schema.slot("firms", "loans_repaid"), Some(1));
        assert_eq!(schema.slot("firms", "unknown"), None);
        assert_eq!(schema.slot("banks", "wages_paid"), None);
    }

    #[test]
    fn writer_zips_names_with_values() {
        let schema = schema();
        let mut writer = schema.writer_for("firms").expect("declared sector");
        writer.set(0, 1200);
        writer.add(1, 300);
        writer.add(1, 200);
        let report = writer.finish();
        assert_eq!(report["wages_paid"], 1200);
        assert_eq!(report["loans_repaid"], 500);
    }

    #[test]
    fn unwritten_slots_report_zero() {
        let schema = schema();
        let writer = schema.writer_for("firms").expect("declared sector");
        let report = writer.finish();
        assert_eq!(report["wages_paid"], 0);
        assert_eq!(report["loans_repaid"], 0);
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let schema = schema();
        let mut writer = schema.writer_for("firms").expect("declared sector");
        writer.set(9, 777);
        let report = writer.finish();
        assert_eq!(report.len(), 2);
        assert!(report.values().all(|v| *v == 0));
    }
}
