// perfmon_report - Rolling Window Performance Report (Table Transforms)
// Copyright (C) 2025 Laurence Oberman
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Turns loaded rows into the two chart shapes.
//!
//! - [`rank_filter`]: system trend, one `%cpu-system`/`%memory-system`
//!   reading per sample, indexed by time.
//! - [`aggregate_processes`]: per time bucket CPU by process, with every
//!   process under 10% of its bucket folded into one "Other" column.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Result;
use crate::table::{ProcessRow, SystemRow, Table};

/// Processes whose bucket total stays under this are folded into [`OTHER_PROCESSES`].
pub const PROCESS_THRESHOLD: f64 = 10.0;
pub const OTHER_PROCESSES: &str = "Other - Processes < 10%";

pub const CPU_SYSTEM: &str = "%cpu-system";
pub const MEMORY_SYSTEM: &str = "%memory-system";

/// Numeric table with a labelled index and named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    index: Vec<String>,
    columns: Vec<String>,
    // row-major, rows.len() == index.len(), each row.len() == columns.len()
    rows: Vec<Vec<f64>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Frame {
            index: Vec::new(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.index.push(label.into());
        self.rows.push(values);
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All values of one column, in index order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[col]).collect())
    }

    /// Value at the first row labelled `label`.
    pub fn get(&self, label: &str, column: &str) -> Option<f64> {
        let row = self.index.iter().position(|l| l == label)?;
        let col = self.columns.iter().position(|c| c == column)?;
        Some(self.rows[row][col])
    }

    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }

    /// Tallest stacked row.
    pub fn max_row_sum(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| r.iter().sum::<f64>())
            .fold(0.0, f64::max)
    }
}

/// Keeps the rank-1 system readings and indexes them by time.
pub fn rank_filter(table: Table<SystemRow>) -> Result<Frame> {
    Ok(rank_filter_rows(table.into_rows()?))
}

pub fn rank_filter_rows(rows: Vec<SystemRow>) -> Frame {
    let total = rows.len();
    let mut frame = Frame::new(vec![CPU_SYSTEM.to_string(), MEMORY_SYSTEM.to_string()]);
    for row in rows.into_iter().filter(|r| r.rank == 1) {
        frame.push_row(row.time, vec![row.cpu, row.memory]);
    }
    debug!(rows = total, kept = frame.len(), "rank filter");
    frame
}

/// CPU per time bucket and process, minor processes folded together.
pub fn aggregate_processes(table: Table<ProcessRow>) -> Result<Frame> {
    Ok(aggregate_process_rows(table.into_rows()?))
}

pub fn aggregate_process_rows(rows: Vec<ProcessRow>) -> Frame {
    // (time, process) -> summed cpu
    let mut groups: BTreeMap<(String, String), f64> = BTreeMap::new();
    for row in rows.into_iter().filter(|r| r.cpu > 0.0) {
        *groups.entry((row.time, row.name)).or_insert(0.0) += row.cpu;
    }

    let mut buckets: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut names = BTreeSet::new();
    for ((time, name), cpu) in groups {
        let name = if cpu < PROCESS_THRESHOLD {
            OTHER_PROCESSES.to_string()
        } else {
            name
        };
        *buckets.entry(time).or_default().entry(name.clone()).or_insert(0.0) += cpu;
        names.insert(name);
    }

    let columns: Vec<String> = names.into_iter().collect();
    let mut frame = Frame::new(columns.clone());
    for (time, by_name) in buckets {
        let values = columns
            .iter()
            .map(|c| by_name.get(c).copied().unwrap_or(0.0))
            .collect();
        frame.push_row(time, values);
    }
    debug!(buckets = frame.len(), processes = frame.columns().len(), "process aggregation");
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sys(time: &str, cpu: f64, memory: f64, rank: i64) -> SystemRow {
        SystemRow { time: time.into(), cpu, memory, rank }
    }

    fn proc_row(time: &str, name: &str, cpu: f64) -> ProcessRow {
        ProcessRow { time: time.into(), name: name.into(), cpu }
    }

    #[test]
    fn test_rank_filter_keeps_rank_one() {
        let frame = rank_filter_rows(vec![
            sys("2024-01-30_10:00:00", 12.0, 40.0, 1),
            sys("2024-01-30_10:00:00", 12.0, 40.0, 2),
            sys("2024-01-30_10:00:00", 12.0, 40.0, 3),
            sys("2024-01-30_10:05:00", 20.0, 41.0, 1),
            sys("2024-01-30_10:05:00", 20.0, 41.0, 2),
        ]);
        assert_eq!(frame.columns(), &[CPU_SYSTEM.to_string(), MEMORY_SYSTEM.to_string()]);
        assert!(!frame.columns().iter().any(|c| c == "process-rank"));
        assert_eq!(frame.index(), &["2024-01-30_10:00:00".to_string(), "2024-01-30_10:05:00".to_string()]);
        assert_eq!(frame.column(CPU_SYSTEM).unwrap(), vec![12.0, 20.0]);
        assert_eq!(frame.get("2024-01-30_10:05:00", MEMORY_SYSTEM), Some(41.0));
    }

    #[test]
    fn test_minor_processes_collapse_into_other() {
        let frame = aggregate_process_rows(vec![
            proc_row("10:00:00", "mds", 4.0),
            proc_row("10:00:00", "Finder", 3.0),
            proc_row("10:00:00", "Safari", 40.0),
            proc_row("10:00:00", "Dock", 2.0),
        ]);
        assert_eq!(frame.columns(), &[OTHER_PROCESSES.to_string(), "Safari".to_string()]);
        assert_eq!(frame.get("10:00:00", OTHER_PROCESSES), Some(9.0));
        assert_eq!(frame.get("10:00:00", "Safari"), Some(40.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        let frame = aggregate_process_rows(vec![
            proc_row("10:00:00", "backupd", 10.0),
            proc_row("10:00:00", "Dock", 9.99),
        ]);
        assert_eq!(frame.get("10:00:00", "backupd"), Some(10.0));
        assert_eq!(frame.get("10:00:00", OTHER_PROCESSES), Some(9.99));
    }

    #[test]
    fn test_threshold_uses_bucket_total() {
        // two samples of the same process in one bucket add up past the threshold
        let frame = aggregate_process_rows(vec![
            proc_row("10:00:00", "Xcode", 6.0),
            proc_row("10:00:00", "Xcode", 6.0),
            proc_row("10:05:00", "Xcode", 5.0),
        ]);
        assert_eq!(frame.get("10:00:00", "Xcode"), Some(12.0));
        assert_eq!(frame.get("10:00:00", OTHER_PROCESSES), Some(0.0));
        assert_eq!(frame.get("10:05:00", "Xcode"), Some(0.0));
        assert_eq!(frame.get("10:05:00", OTHER_PROCESSES), Some(5.0));
    }

    #[test]
    fn test_idle_processes_are_dropped() {
        let frame = aggregate_process_rows(vec![
            proc_row("10:00:00", "launchd", 0.0),
            proc_row("10:00:00", "Safari", 25.0),
            proc_row("10:05:00", "launchd", 0.0),
        ]);
        assert_eq!(frame.index(), &["10:00:00".to_string()]);
        assert_eq!(frame.columns(), &["Safari".to_string()]);
        assert!(aggregate_process_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_frame_extremes() {
        let mut frame = Frame::new(vec!["a".into(), "b".into()]);
        frame.push_row("t1", vec![30.0, 50.0]);
        frame.push_row("t2", vec![60.0, 10.0]);
        assert_eq!(frame.max_value(), 60.0);
        assert_eq!(frame.max_row_sum(), 80.0);
        assert_eq!(Frame::default().max_row_sum(), 0.0);
    }
}
