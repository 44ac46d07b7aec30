// perfmon_report - Rolling Window Performance Report (Table Loader)
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

/*!
    # table.rs

    Loads staged perfmon CSVs into typed rows.

    Each row shape names the columns it reads and converts every raw string
    field on the way in:
    - `%` fields: `"12.5%"` -> `12.5`
    - process time: `"2024-01-30_13:05:00"` -> `"13:05:00"`
    - process name: `"/usr/libexec/mds_stores"` -> `"mds_stores"`

    Files are picked by the date their name starts with, either one exact
    date or every date of the reporting window. Any row that will not
    convert fails the load with the file, line and column.
*/

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use once_cell::unsync::OnceCell;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::corpus::{RelevantDates, StagedCorpus, dated_record};
use crate::error::{ReportError, Result};

/// A row shape read from perfmon CSVs.
pub trait Record: Sized {
    /// Columns as they appear in the file, all read as strings.
    type Raw: DeserializeOwned;

    /// Columns this shape needs; every one must be present in the header.
    const COLUMNS: &'static [&'static str];

    fn convert(raw: Self::Raw) -> std::result::Result<Self, ConvertError>;
}

/// A field a converter refused.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertError {
    pub column: &'static str,
    pub value: String,
    pub reason: String,
}

fn field<T>(
    column: &'static str,
    value: String,
    convert: fn(&str) -> std::result::Result<T, String>,
) -> std::result::Result<T, ConvertError> {
    convert(&value).map_err(|reason| ConvertError {
        column,
        value,
        reason,
    })
}

// ---------- column converters ----------

/// `"12.5%"` -> `12.5`
pub fn percent(raw: &str) -> std::result::Result<f64, String> {
    raw.trim()
        .trim_matches('%')
        .trim()
        .parse::<f64>()
        .map_err(|e| e.to_string())
}

/// Time-of-day label: whatever follows the first `_` of the raw stamp.
pub fn time_label(raw: &str) -> std::result::Result<String, String> {
    raw.split_once('_')
        .map(|(_, label)| label.to_string())
        .ok_or_else(|| "expected '<date>_<time>'".to_string())
}

/// Bare process name: last segment of a path-like field.
pub fn process_name(raw: &str) -> std::result::Result<String, String> {
    Ok(raw.rsplit('/').next().unwrap_or(raw).to_string())
}

pub fn rank(raw: &str) -> std::result::Result<i64, String> {
    raw.trim().parse::<i64>().map_err(|e| e.to_string())
}

fn verbatim(raw: &str) -> std::result::Result<String, String> {
    Ok(raw.to_string())
}

// ---------- row shapes ----------

/// System-wide sample; repeated once per monitored process in the raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemRow {
    pub time: String,
    pub cpu: f64,
    pub memory: f64,
    pub rank: i64,
}

#[derive(Debug, Deserialize)]
pub struct RawSystemRow {
    time: String,
    #[serde(rename = "%cpu-system")]
    cpu: String,
    #[serde(rename = "%memory-system")]
    memory: String,
    #[serde(rename = "process-rank")]
    rank: String,
}

impl Record for SystemRow {
    type Raw = RawSystemRow;
    const COLUMNS: &'static [&'static str] =
        &["time", "%cpu-system", "%memory-system", "process-rank"];

    fn convert(raw: RawSystemRow) -> std::result::Result<Self, ConvertError> {
        Ok(SystemRow {
            time: field("time", raw.time, verbatim)?,
            cpu: field("%cpu-system", raw.cpu, percent)?,
            memory: field("%memory-system", raw.memory, percent)?,
            rank: field("process-rank", raw.rank, rank)?,
        })
    }
}

/// Per-process CPU sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub time: String,
    pub name: String,
    pub cpu: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawProcessRow {
    time: String,
    #[serde(rename = "process-name")]
    name: String,
    #[serde(rename = "%cpu-process")]
    cpu: String,
}

impl Record for ProcessRow {
    type Raw = RawProcessRow;
    const COLUMNS: &'static [&'static str] = &["time", "process-name", "%cpu-process"];

    fn convert(raw: RawProcessRow) -> std::result::Result<Self, ConvertError> {
        Ok(ProcessRow {
            time: field("time", raw.time, time_label)?,
            name: field("process-name", raw.name, process_name)?,
            cpu: field("%cpu-process", raw.cpu, percent)?,
        })
    }
}

// ---------- loading ----------

/// Which staged files a table reads.
#[derive(Debug, Clone, Copy)]
pub enum DateFilter<'a> {
    /// Files for exactly this date.
    Exact(NaiveDate),
    /// Files for any date in the reporting window.
    Relevant(&'a RelevantDates),
}

impl DateFilter<'_> {
    fn accepts(&self, date: &NaiveDate) -> bool {
        match self {
            DateFilter::Exact(want) => want == date,
            DateFilter::Relevant(dates) => dates.contains(date),
        }
    }
}

/// Staged file names the filter selects, in staged (chronological) order.
///
/// Names outside the `<YYYY-MM-DD>[...]` convention are never selected.
pub fn select_files(files: &[String], filter: DateFilter<'_>) -> Vec<String> {
    files
        .iter()
        .filter(|file| dated_record(file).is_some_and(|date| filter.accepts(&date)))
        .cloned()
        .collect()
}

/// Reads and converts every row of the selected files, file by file.
pub fn load<R: Record>(
    staging_dir: &Path,
    files: &[String],
    filter: DateFilter<'_>,
) -> Result<Vec<R>> {
    read_files(staging_dir, &select_files(files, filter))
}

fn load_file<R: Record>(staging_dir: &Path, file: &str) -> Result<Vec<R>> {
    let csv_err = |source| ReportError::Csv {
        file: file.to_string(),
        source,
    };
    let mut rdr = csv::Reader::from_path(staging_dir.join(file)).map_err(csv_err)?;
    let headers = rdr.headers().map_err(csv_err)?.clone();

    if let Some(missing) = R::COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(ReportError::MissingColumn {
            file: file.to_string(),
            column: missing.to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw: R::Raw = record.deserialize(Some(&headers)).map_err(csv_err)?;
        let row = R::convert(raw).map_err(|e| ReportError::BadValue {
            file: file.to_string(),
            line,
            column: e.column.to_string(),
            value: e.value,
            reason: e.reason,
        })?;
        rows.push(row);
    }
    debug!(file, rows = rows.len(), "loaded record file");
    Ok(rows)
}

/// Rows of one shape drawn from a staged corpus.
///
/// Files are chosen up front; they are parsed on first access only and the
/// rows kept for the life of the table.
#[derive(Debug)]
pub struct Table<R> {
    staging_dir: PathBuf,
    files: Vec<String>,
    rows: OnceCell<Vec<R>>,
}

impl<R: Record> Table<R> {
    pub fn new(corpus: &StagedCorpus, filter: DateFilter<'_>) -> Self {
        Table {
            staging_dir: corpus.staging_dir().to_path_buf(),
            files: select_files(corpus.relevant_csv_files(), filter),
            rows: OnceCell::new(),
        }
    }

    /// Every row in the corpus within the reporting window.
    pub fn relevant(corpus: &StagedCorpus) -> Self {
        Self::new(corpus, DateFilter::Relevant(corpus.relevant_dates()))
    }

    /// Rows for a single day.
    pub fn for_date(corpus: &StagedCorpus, date: NaiveDate) -> Self {
        Self::new(corpus, DateFilter::Exact(date))
    }

    pub fn is_loaded(&self) -> bool {
        self.rows.get().is_some()
    }

    pub fn rows(&self) -> Result<&[R]> {
        self.rows
            .get_or_try_init(|| self.read_all())
            .map(Vec::as_slice)
    }

    pub fn into_rows(self) -> Result<Vec<R>> {
        let Table { staging_dir, files, rows } = self;
        match rows.into_inner() {
            Some(rows) => Ok(rows),
            None => read_files(&staging_dir, &files),
        }
    }

    fn read_all(&self) -> Result<Vec<R>> {
        read_files(&self.staging_dir, &self.files)
    }
}

fn read_files<R: Record>(staging_dir: &Path, files: &[String]) -> Result<Vec<R>> {
    let mut rows = Vec::new();
    for file in files {
        rows.extend(load_file::<R>(staging_dir, file)?);
    }
    Ok(rows)
}
