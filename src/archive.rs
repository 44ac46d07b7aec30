// perfmon_report - Rolling Window Performance Report (Archive Index)
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
    # archive.rs

    Discovery of perfmon log archives and loose daily record files.

    - Archives are `*.tar.gz` bundles, each holding a rolling period of daily CSVs.
    - Loose records are `*.csv` files sitting next to the archives (today's data,
      not yet rolled into an archive).
    - Nothing here writes to disk.
*/

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::{ReportError, Result};

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const RECORD_SUFFIX: &str = ".csv";

/// A compressed bundle of daily record files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub created: SystemTime,
}

/// Source of archives and loose record files.
pub trait ArchiveIndex {
    /// All archives, most recently created first.
    fn list_archives(&self) -> Result<Vec<Archive>>;

    /// Record files that live outside any archive, sorted by name.
    fn list_loose_records(&self) -> Result<Vec<PathBuf>>;
}

/// The perfmon log directory (`../logs` on a managed machine).
#[derive(Debug, Clone)]
pub struct LogDirectory {
    dir: PathBuf,
}

impl LogDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Regular files in the directory whose name ends with `suffix`.
    fn files_with_suffix(&self, suffix: &str) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            // No log directory yet simply means no history.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReportError::io(&self.dir, e)),
        };

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ReportError::io(&self.dir, e))?;
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map(|t| t.is_file())
                .map_err(|e| ReportError::io(&path, e))?;
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix));
            if is_file && matches {
                out.push(path);
            }
        }
        Ok(out)
    }
}

impl ArchiveIndex for LogDirectory {
    fn list_archives(&self) -> Result<Vec<Archive>> {
        let mut archives = Vec::new();
        for path in self.files_with_suffix(ARCHIVE_SUFFIX)? {
            let meta = fs::metadata(&path).map_err(|e| ReportError::io(&path, e))?;
            // Birth time is not available on every filesystem.
            let created = meta
                .created()
                .or_else(|_| meta.modified())
                .map_err(|e| ReportError::io(&path, e))?;
            archives.push(Archive { path, created });
        }
        sort_newest_first(&mut archives);
        Ok(archives)
    }

    fn list_loose_records(&self) -> Result<Vec<PathBuf>> {
        let mut records = self.files_with_suffix(RECORD_SUFFIX)?;
        records.sort();
        Ok(records)
    }
}

/// Newest first; equal timestamps fall back to name, descending.
pub fn sort_newest_first(archives: &mut [Archive]) {
    archives.sort_by(|a, b| {
        b.created
            .cmp(&a.created)
            .then_with(|| b.path.cmp(&a.path))
    });
}
