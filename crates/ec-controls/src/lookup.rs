//! Temperature → water-vapour capacity lookup.
//!
//! The table answers "how much water (g/m³) can air hold at the next whole
//! degree below the prevailing temperature", which is what the steam decision
//! compares the measured humidity against.
//!
//! Source format: a header row followed by `capacity,temperature` rows, e.g.
//!
//! ```text
//! gm3,temperature
//! 12.85,15
//! 17.28,20
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{ControlError, ControlResult};

/// Immutable temperature (°C, integral) → capacity (g/m³) table.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityTable {
    entries: BTreeMap<i32, f64>,
}

impl CapacityTable {
    /// Parse a delimited table, skipping the header row.
    ///
    /// Blank lines are ignored. Any other row that does not parse as
    /// `(float, integer)` fails the whole load. A repeated temperature keeps
    /// the last capacity seen.
    pub fn load<R: BufRead>(reader: R) -> ControlResult<Self> {
        let mut entries = BTreeMap::new();

        for (index, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            let line_no = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (temperature, capacity) = parse_row(&line, line_no)?;
            entries.insert(temperature, capacity);
        }

        if entries.is_empty() {
            return Err(ControlError::EmptyTable);
        }
        tracing::debug!(rows = entries.len(), "loaded capacity table");
        Ok(Self { entries })
    }

    /// Load the table from a file on disk.
    pub fn from_path(path: &Path) -> ControlResult<Self> {
        let file = File::open(path).map_err(|e| ControlError::TableFileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::load(BufReader::new(file))
    }

    /// Build a table from `(capacity, temperature)` rows.
    pub fn from_rows(rows: impl IntoIterator<Item = (f64, i32)>) -> ControlResult<Self> {
        let entries: BTreeMap<i32, f64> = rows.into_iter().map(|(gm3, t)| (t, gm3)).collect();
        if entries.is_empty() {
            return Err(ControlError::EmptyTable);
        }
        Ok(Self { entries })
    }

    /// Among stored temperatures strictly below `target`, the highest one and
    /// its capacity.
    ///
    /// Returns `None` when no stored temperature is below `target`, or when
    /// `target` is not finite.
    pub fn closest_at_or_below(&self, target: f64) -> Option<(i32, f64)> {
        if !target.is_finite() {
            return None;
        }
        // Integral keys: k < target  <=>  k < ceil(target).
        let bound = target.ceil().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
        self.entries
            .range(..bound)
            .next_back()
            .map(|(&t, &gm3)| (t, gm3))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows in ascending temperature order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.entries.iter().map(|(&t, &gm3)| (t, gm3))
    }
}

fn parse_row(line: &str, line_no: usize) -> ControlResult<(i32, f64)> {
    let mut fields = line.split(',').map(str::trim);
    let (Some(gm3), Some(temp), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(ControlError::TableRow {
            line: line_no,
            what: format!("expected 2 fields in '{line}'"),
        });
    };

    let capacity: f64 = gm3.parse().map_err(|_| ControlError::TableRow {
        line: line_no,
        what: format!("capacity '{gm3}' is not a number"),
    })?;
    if !capacity.is_finite() {
        return Err(ControlError::TableRow {
            line: line_no,
            what: format!("capacity '{gm3}' is not finite"),
        });
    }
    let temperature: i32 = temp.parse().map_err(|_| ControlError::TableRow {
        line: line_no,
        what: format!("temperature '{temp}' is not an integer"),
    })?;

    Ok((temperature, capacity))
}
