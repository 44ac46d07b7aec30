// perfmon_report - Rolling Window Performance Report (Errors)
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

//! Error types shared by every stage of a report run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a report run.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Window size outside the supported set.
    #[error("unsupported reporting window: {days} days (supported: 30, 60, 90, 180)")]
    InvalidWindow { days: u32 },

    /// Staging directory left over from an unfinished run.
    #[error("staging directory already exists: {} (remove it and re-run)", path.display())]
    StagingExists { path: PathBuf },

    /// Filesystem failure outside the record data itself.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive could not be opened or unpacked.
    #[error("failed to extract archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staged file name does not start with an ISO date.
    #[error("record file '{file}' does not start with an ISO date (expected '<YYYY-MM-DD>[...]')")]
    BadRecordName { file: String },

    /// Record file lacks a column the table needs.
    #[error("record file '{file}' is missing column '{column}'")]
    MissingColumn { file: String, column: String },

    /// A value the column converter rejected.
    #[error("record file '{file}' line {line}, column '{column}': bad value '{value}' ({reason})")]
    BadValue {
        file: String,
        line: u64,
        column: String,
        value: String,
        reason: String,
    },

    /// Malformed CSV structure.
    #[error("record file '{file}': {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// Plotting backend failure.
    #[error("failed to render chart '{chart}': {reason}")]
    Render { chart: String, reason: String },
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the data corruption class of errors.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ReportError::BadRecordName { .. }
                | ReportError::MissingColumn { .. }
                | ReportError::BadValue { .. }
                | ReportError::Csv { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
