// perfmon_report - Rolling Window Performance Report (Corpus Extractor)
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
    # corpus.rs

    Stages the record files covering a reporting window.

    - Picks the newest archives for the window (one archive per 30 days).
    - Unpacks them, then copies loose record files on top, into a fresh
      staging directory.
    - Computes the relevant dates: today and the `N-1` days before it.

    The staging directory belongs to the caller once [`stage`] returns; the
    caller removes it after every chart has been rendered.
*/

use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveIndex, RECORD_SUFFIX};
use crate::error::{ReportError, Result};

/// Window size in days -> number of 30-day archives to unpack.
const WINDOW_ARCHIVES: [(u32, usize); 4] = [(30, 1), (60, 2), (90, 3), (180, 6)];

/// A supported reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    days: u32,
    archives: usize,
}

impl ReportWindow {
    pub fn days(self) -> u32 {
        self.days
    }

    pub fn archive_count(self) -> usize {
        self.archives
    }
}

impl TryFrom<u32> for ReportWindow {
    type Error = ReportError;

    fn try_from(days: u32) -> Result<Self> {
        WINDOW_ARCHIVES
            .iter()
            .find(|(d, _)| *d == days)
            .map(|&(days, archives)| ReportWindow { days, archives })
            .ok_or(ReportError::InvalidWindow { days })
    }
}

impl fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.days)
    }
}

/// The calendar dates `{today, today-1, ..., today-(N-1)}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantDates(BTreeSet<NaiveDate>);

impl RelevantDates {
    pub fn new(today: NaiveDate, window: ReportWindow) -> Self {
        let dates = (0..u64::from(window.days()))
            .map(|k| today - Days::new(k))
            .collect();
        RelevantDates(dates)
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.0.contains(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

}

/// Leading segment of a record file name, up to the first `[`.
pub fn record_date_segment(file: &str) -> &str {
    file.split('[').next().unwrap_or(file)
}

/// Parses the ISO date a record file name starts with.
///
/// The segment must be the exact `YYYY-MM-DD` form; `2024-1-5` is rejected.
pub fn record_date(file: &str) -> Result<NaiveDate> {
    let segment = record_date_segment(file);
    NaiveDate::parse_from_str(segment, "%Y-%m-%d")
        .ok()
        .filter(|date| date.format("%Y-%m-%d").to_string() == segment)
        .ok_or_else(|| ReportError::BadRecordName {
            file: file.to_string(),
        })
}

/// Date of a staged record file, or `None` (logged) when the name carries no date.
pub fn dated_record(file: &str) -> Option<NaiveDate> {
    match record_date(file) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(file, "skipping record file: {e}");
            None
        }
    }
}

/// Record files staged for one report run.
#[derive(Debug, Clone)]
pub struct StagedCorpus {
    staging_dir: PathBuf,
    relevant_csv_files: Vec<String>,
    relevant_dates: RelevantDates,
}

impl StagedCorpus {
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Staged record file names, sorted (and therefore chronological).
    pub fn relevant_csv_files(&self) -> &[String] {
        &self.relevant_csv_files
    }

    pub fn relevant_dates(&self) -> &RelevantDates {
        &self.relevant_dates
    }

    /// Date segments of the first and last dated staged files.
    pub fn date_span(&self) -> Option<(&str, &str)> {
        let mut dated = self
            .relevant_csv_files
            .iter()
            .filter(|file| record_date(file).is_ok())
            .map(|file| record_date_segment(file));
        let first = dated.next()?;
        Some((first, dated.last().unwrap_or(first)))
    }

    /// Distinct staged dates inside the window, most recent first.
    pub fn report_days(&self) -> Vec<NaiveDate> {
        let days: BTreeSet<NaiveDate> = self
            .relevant_csv_files
            .iter()
            .filter_map(|file| dated_record(file))
            .filter(|date| self.relevant_dates.contains(date))
            .collect();
        days.into_iter().rev().collect()
    }
}

/// Stages every record file covering `window_days` ending at `today`.
///
/// The window is validated before the filesystem is touched. Fewer archives
/// than the window asks for is tolerated; whatever exists is used.
pub fn stage(
    index: &dyn ArchiveIndex,
    staging_dir: &Path,
    window_days: u32,
    today: NaiveDate,
) -> Result<StagedCorpus> {
    let window = ReportWindow::try_from(window_days)?;

    let mut archives = index.list_archives()?;
    if archives.len() < window.archive_count() {
        warn!(
            window_days,
            wanted = window.archive_count(),
            available = archives.len(),
            "fewer archives than the window needs, using what is available"
        );
    }
    archives.truncate(window.archive_count());
    let loose = index.list_loose_records()?;

    match fs::create_dir(staging_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(ReportError::StagingExists {
                path: staging_dir.to_path_buf(),
            });
        }
        Err(e) => return Err(ReportError::io(staging_dir, e)),
    }

    for archive in &archives {
        debug!(archive = %archive.path.display(), "unpacking");
        extract_archive(&archive.path, staging_dir)?;
    }

    // Copied after extraction so a loose file replaces an archived one of the same name.
    for src in &loose {
        let Some(name) = src.file_name() else { continue };
        let dest = staging_dir.join(name);
        fs::copy(src, &dest).map_err(|e| ReportError::io(src, e))?;
    }

    let relevant_csv_files = staged_record_names(staging_dir)?;
    let relevant_dates = RelevantDates::new(today, window);

    info!(
        window_days,
        archives = archives.len(),
        loose = loose.len(),
        staged = relevant_csv_files.len(),
        "corpus staged"
    );

    Ok(StagedCorpus {
        staging_dir: staging_dir.to_path_buf(),
        relevant_csv_files,
        relevant_dates,
    })
}

fn extract_archive(path: &Path, dest: &Path) -> Result<()> {
    let archive_err = |source| ReportError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(archive_err)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.unpack(dest).map_err(archive_err)
}

/// Top-level `*.csv` names in the staging directory, sorted.
fn staged_record_names(staging_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(staging_dir).map_err(|e| ReportError::io(staging_dir, e))? {
        let entry = entry.map_err(|e| ReportError::io(staging_dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| ReportError::io(entry.path(), e))?
            .is_file();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && name.ends_with(RECORD_SUFFIX) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::time::{Duration, SystemTime};

    /// Index with a fixed archive order.
    struct FixedIndex {
        archives: Vec<Archive>,
        loose: Vec<PathBuf>,
    }

    impl ArchiveIndex for FixedIndex {
        fn list_archives(&self) -> Result<Vec<Archive>> {
            Ok(self.archives.clone())
        }

        fn list_loose_records(&self) -> Result<Vec<PathBuf>> {
            Ok(self.loose.clone())
        }
    }

    fn write_archive(path: &Path, files: &[(&str, &str)]) {
        let gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    /// Six archives, newest first, each holding one file named after it.
    fn six_archives(dir: &Path) -> FixedIndex {
        let base = SystemTime::UNIX_EPOCH;
        let archives = (0..6)
            .map(|i| {
                let path = dir.join(format!("archive{i}.tar.gz"));
                let file = format!("2024-0{}-01[a{i}].csv", i + 1);
                write_archive(&path, &[(file.as_str(), "time\n")]);
                Archive {
                    path,
                    created: base + Duration::from_secs(100 - i as u64),
                }
            })
            .collect();
        FixedIndex {
            archives,
            loose: Vec::new(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_window_archive_mapping() {
        let counts: Vec<_> = [30, 60, 90, 180]
            .into_iter()
            .map(|d| ReportWindow::try_from(d).unwrap().archive_count())
            .collect();
        assert_eq!(counts, vec![1, 2, 3, 6]);
        assert!(matches!(
            ReportWindow::try_from(45),
            Err(ReportError::InvalidWindow { days: 45 })
        ));
        assert!(ReportWindow::try_from(0).is_err());
    }

    #[test]
    fn test_relevant_dates() {
        let window = ReportWindow::try_from(60).unwrap();
        let dates = RelevantDates::new(day("2024-03-01"), window);
        assert_eq!(dates.len(), 60);
        assert!(dates.contains(&day("2024-03-01")));
        assert!(dates.contains(&day("2024-02-29")));
        assert!(dates.contains(&day("2024-01-02")));
        assert!(!dates.contains(&day("2024-01-01")));
        assert!(!dates.contains(&day("2024-03-02")));
    }

    #[test]
    fn test_selects_newest_archives_per_window() {
        let tmp = tempfile::tempdir().unwrap();
        let index = six_archives(tmp.path());
        for (days, expected) in [(30, 1), (60, 2), (90, 3), (180, 6)] {
            let staging = tmp.path().join(format!("unpacked{days}"));
            let corpus = stage(&index, &staging, days, day("2024-06-30")).unwrap();
            assert_eq!(corpus.relevant_csv_files().len(), expected);
            // archive0 is the newest and must always be included
            assert!(corpus.relevant_csv_files().contains(&"2024-01-01[a0].csv".to_string()));
        }
    }

    #[test]
    fn test_insufficient_history_uses_available() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = six_archives(tmp.path());
        index.archives.truncate(2);
        let corpus = stage(&index, &tmp.path().join("unpacked"), 180, day("2024-06-30")).unwrap();
        assert_eq!(corpus.relevant_csv_files().len(), 2);
        assert_eq!(corpus.relevant_dates().len(), 180);

        let empty = FixedIndex { archives: Vec::new(), loose: Vec::new() };
        let corpus = stage(&empty, &tmp.path().join("unpacked2"), 30, day("2024-06-30")).unwrap();
        assert!(corpus.relevant_csv_files().is_empty());
        assert!(corpus.date_span().is_none());
    }

    #[test]
    fn test_invalid_window_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let index = six_archives(tmp.path());
        let staging = tmp.path().join("unpacked");
        let err = stage(&index, &staging, 45, day("2024-06-30")).unwrap_err();
        assert!(matches!(err, ReportError::InvalidWindow { days: 45 }));
        assert!(!staging.exists());
    }

    #[test]
    fn test_existing_staging_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let index = six_archives(tmp.path());
        let staging = tmp.path().join("unpacked");
        fs::create_dir(&staging).unwrap();
        let err = stage(&index, &staging, 30, day("2024-06-30")).unwrap_err();
        assert!(matches!(err, ReportError::StagingExists { .. }));
    }

    #[test]
    fn test_loose_file_overrides_archived_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("jan.tar.gz");
        write_archive(
            &archive,
            &[("2024-01-30[host].csv", "archived\n"), ("2024-01-29[host].csv", "old\n")],
        );
        let loose = tmp.path().join("2024-01-30[host].csv");
        fs::write(&loose, "loose\n").unwrap();
        let index = FixedIndex {
            archives: vec![Archive { path: archive, created: SystemTime::UNIX_EPOCH }],
            loose: vec![loose],
        };

        let staging = tmp.path().join("unpacked");
        let corpus = stage(&index, &staging, 30, day("2024-01-30")).unwrap();
        assert_eq!(
            corpus.relevant_csv_files(),
            &["2024-01-29[host].csv".to_string(), "2024-01-30[host].csv".to_string()]
        );
        let body = fs::read_to_string(staging.join("2024-01-30[host].csv")).unwrap();
        assert_eq!(body, "loose\n");
        assert_eq!(corpus.date_span(), Some(("2024-01-29", "2024-01-30")));
    }

    #[test]
    fn test_staging_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let index = six_archives(tmp.path());
        let staging = tmp.path().join("unpacked");

        let first = stage(&index, &staging, 90, day("2024-06-30")).unwrap();
        fs::remove_dir_all(&staging).unwrap();
        let second = stage(&index, &staging, 90, day("2024-06-30")).unwrap();

        assert_eq!(first.relevant_csv_files(), second.relevant_csv_files());
        assert_eq!(first.relevant_dates(), second.relevant_dates());
    }

    #[test]
    fn test_report_days_most_recent_first() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("jan.tar.gz");
        write_archive(
            &archive,
            &[
                ("2023-12-01[host].csv", "time\n"),
                ("2024-01-28[host].csv", "time\n"),
                ("2024-01-30[a].csv", "time\n"),
                ("2024-01-30[b].csv", "time\n"),
            ],
        );
        let index = FixedIndex {
            archives: vec![Archive { path: archive, created: SystemTime::UNIX_EPOCH }],
            loose: Vec::new(),
        };
        let corpus = stage(&index, &tmp.path().join("unpacked"), 30, day("2024-01-30")).unwrap();
        assert_eq!(
            corpus.report_days(),
            vec![day("2024-01-30"), day("2024-01-28")]
        );
    }

    #[test]
    fn test_record_date_contract() {
        assert_eq!(record_date_segment("2024-01-05[mac-01].csv"), "2024-01-05");
        assert_eq!(record_date("2024-01-05[mac-01].csv").unwrap(), day("2024-01-05"));
        assert!(matches!(
            record_date("perfmon.csv"),
            Err(ReportError::BadRecordName { .. })
        ));
        // unpadded dates are not ISO
        assert!(record_date("2024-1-5[h].csv").is_err());
        assert!(record_date("2024-01-5[h].csv").is_err());
        assert_eq!(dated_record("perfmon-summary.csv"), None);
    }

    #[test]
    fn test_report_days_skip_undated_files() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("jan.tar.gz");
        write_archive(
            &archive,
            &[("2024-01-30[h].csv", "time\n"), ("perfmon-summary.csv", "time\n")],
        );
        let index = FixedIndex {
            archives: vec![Archive { path: archive, created: SystemTime::UNIX_EPOCH }],
            loose: Vec::new(),
        };
        let corpus = stage(&index, &tmp.path().join("unpacked"), 30, day("2024-01-30")).unwrap();
        assert_eq!(corpus.relevant_csv_files().len(), 2);
        assert_eq!(corpus.report_days(), vec![day("2024-01-30")]);
        assert_eq!(corpus.date_span(), Some(("2024-01-30", "2024-01-30")));
    }
}
