// perfmon_report - Rolling Window Performance Report (Main Entry)
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

//! # perfmon_report Main Entry Point
//!
//! Reads the window and owner from flags or `NUM_DAYS`/`USER_NAME`, builds
//! the report and prints where it was written.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use perfmon_report::config::{Cli, ReportConfig};
use perfmon_report::report;

// Increment as tool evolves
const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(false).init();

    tracing::info!(version = VERSION_NUMBER, "perfmon_report starting");

    let config = ReportConfig::from(cli);
    let out = report::run(&config).with_context(|| {
        format!(
            "building {}-day report for {} from {}",
            config.window_days,
            config.user,
            config.logs_dir.display()
        )
    })?;

    println!("Report written to {}", out.display());
    Ok(())
}
