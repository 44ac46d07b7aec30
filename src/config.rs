// perfmon_report - Rolling Window Performance Report (Configuration)
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

//! Command line and environment configuration.
//!
//! The perfmon agent launches the report with `NUM_DAYS` and `USER_NAME` in
//! the environment; both are also accepted as flags.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;

/// Builds a CPU/Memory and top-process report from perfmon log archives.
#[derive(Parser, Debug)]
#[command(name = "perfmon_report", version, about)]
pub struct Cli {
    /// Reporting window in days (30, 60, 90 or 180).
    #[arg(short, long, env = "NUM_DAYS")]
    pub days: u32,

    /// Report owner; defaults to the machine's hostname.
    #[arg(short, long, env = "USER_NAME")]
    pub user: Option<String>,

    /// Directory holding the `*.tar.gz` archives and loose `*.csv` records.
    #[arg(long, env = "PERFMON_LOGS_DIR", default_value = "../logs")]
    pub logs_dir: PathBuf,

    /// Where the report is written; defaults to the logs directory.
    #[arg(short, long, env = "PERFMON_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report as of this date (YYYY-MM-DD) instead of today.
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Leave the staging directory in place after the run.
    #[arg(long)]
    pub keep_staging: bool,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Everything one report run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub window_days: u32,
    pub user: String,
    pub logs_dir: PathBuf,
    pub output_dir: PathBuf,
    pub today: NaiveDate,
    pub keep_staging: bool,
}

impl From<Cli> for ReportConfig {
    fn from(cli: Cli) -> Self {
        let output_dir = cli.output_dir.unwrap_or_else(|| cli.logs_dir.clone());
        ReportConfig {
            window_days: cli.days,
            user: cli.user.unwrap_or_else(default_user),
            logs_dir: cli.logs_dir,
            output_dir,
            today: cli.today.unwrap_or_else(|| Local::now().date_naive()),
            keep_staging: cli.keep_staging,
        }
    }
}

fn default_user() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_build_config() {
        let cli = Cli::try_parse_from([
            "perfmon_report",
            "--days", "60",
            "--user", "jdoe",
            "--logs-dir", "/var/log/perfmon",
            "--today", "2024-01-30",
        ])
        .unwrap();
        let config = ReportConfig::from(cli);
        assert_eq!(config.window_days, 60);
        assert_eq!(config.user, "jdoe");
        assert_eq!(config.output_dir, PathBuf::from("/var/log/perfmon"));
        assert_eq!(config.today, NaiveDate::from_ymd_opt(2024, 1, 30).unwrap());
        assert!(!config.keep_staging);
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let parsed = Cli::try_parse_from(["perfmon_report", "--days", "30", "--today", "30/01/2024"]);
        assert!(parsed.is_err());
    }
}
