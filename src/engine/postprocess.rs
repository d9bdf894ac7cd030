//! Post-processing: unit rescaling and derived charts
//!
//! Runs once per ingestion run, after `finalize`. Percent-valued series
//! read better on a 0..100 axis, and byte rates read better in megabits;
//! both are pure rescales of already-final tables. Derived charts combine
//! two finalized tables cell-wise; their operands may be cleared
//! afterwards so the same data is not exported twice.

use super::SnapshotEngine;
use crate::table::combine_tables;

use tracing::{debug, warn};

impl SnapshotEngine {
    /// Unit-driven rescaling and derived-chart computation.
    ///
    /// Call after `finalize`; this pass is the only writer once ingestion
    /// has completed.
    pub fn post_process(&mut self) {
        self.convert_units();
        self.compute_derived_charts();
    }

    fn convert_units(&mut self) {
        for (key, unit) in self.units.iter_mut() {
            let (factor, relabel) = match unit.as_str() {
                "percent" => (100.0, "%"),
                "b_per_sec" => (1e-6, "Mb/s"),
                "kb_per_sec" => (1e-3, "Mb/s"),
                _ => continue,
            };
            if let Some(table) = self.tables.get_mut(key) {
                table.scale(factor);
            }
            debug!(series = %key, from = %unit, to = relabel, "unit rescaled");
            *unit = relabel.to_string();
        }
    }

    fn compute_derived_charts(&mut self) {
        for chart in self.catalog.derived_charts().to_vec() {
            let unit1 = self.units.get(&chart.operand1);
            let unit2 = self.units.get(&chart.operand2);
            if unit1 != unit2 {
                warn!(
                    chart = %chart.key,
                    operand1 = %chart.operand1,
                    operand2 = %chart.operand2,
                    "derived chart operands disagree on unit, result is suspect"
                );
            }

            let (Some(operand1), Some(operand2)) = (
                self.tables.get(&chart.operand1),
                self.tables.get(&chart.operand2),
            ) else {
                warn!(chart = %chart.key, "derived chart operand table missing, skipped");
                continue;
            };

            let mut result = combine_tables(chart.op, operand1, operand2);
            if let Some((name, value)) = &chart.reference_line {
                if !result.is_empty() {
                    result.add_constant_column(name.clone(), *value);
                }
            }

            self.units.insert(chart.key.clone(), chart.unit.clone());
            if chart.clear_operands {
                if let Some(table) = self.tables.get_mut(&chart.operand1) {
                    table.clear();
                }
                if let Some(table) = self.tables.get_mut(&chart.operand2) {
                    table.clear();
                }
            }
            self.tables.insert(chart.key.clone(), result);
        }
    }
}
