// perfmon_report - Rolling Window Performance Report (Report Assembly)
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
    # report.rs

    Drives one report run:
    1. Stage the corpus for the window.
    2. System CPU/Memory trend over every relevant day.
    3. One top-process chart per staged day, most recent first.
    4. Write all pages to `<user>-<days>DayReport.html`.
    5. Remove the staging directory.

    Charts render in memory first; the document is only written once every
    page exists, so a failed run never leaves a partial report behind.
*/

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::archive::LogDirectory;
use crate::chart::{self, Chart, ChartKind, ChartOptions, Legend, PAGE_INCHES};
use crate::config::ReportConfig;
use crate::corpus::{self, ReportWindow, StagedCorpus};
use crate::error::{ReportError, Result};
use crate::table::{ProcessRow, SystemRow, Table};
use crate::transform;

/// Staging directory name, created inside the logs directory.
pub const STAGING_DIR_NAME: &str = "unpacked";
pub const Y_LABEL: &str = "Overall CPU Usage %";

pub fn report_file_name(user: &str, window: ReportWindow) -> String {
    format!("{}-{}DayReport.html", user, window.days())
}

/// System-wide CPU/Memory trend across the window.
pub fn system_chart(corpus: &StagedCorpus) -> Result<Chart> {
    let table: Table<SystemRow> = Table::relevant(corpus);
    let frame = transform::rank_filter(table)?;
    let x_label = match corpus.date_span() {
        Some((start, end)) => format!("{start} - {end}"),
        None => "no records staged".to_string(),
    };
    chart::render(
        &frame,
        ChartKind::Line,
        &ChartOptions {
            x_label,
            y_label: Y_LABEL.to_string(),
            legend: Legend::Labels(vec!["CPU".to_string(), "Memory".to_string()]),
        },
    )
}

/// Top processes for one day.
pub fn process_chart(corpus: &StagedCorpus, day: NaiveDate) -> Result<Chart> {
    let table: Table<ProcessRow> = Table::for_date(corpus, day);
    let frame = transform::aggregate_processes(table)?;
    chart::render(
        &frame,
        ChartKind::StackedBar,
        &ChartOptions {
            x_label: day.format("%Y-%m-%d").to_string(),
            y_label: Y_LABEL.to_string(),
            legend: Legend::Columns,
        },
    )
}

/// Every page of the report, in order.
pub fn build_charts(corpus: &StagedCorpus) -> Result<Vec<Chart>> {
    let mut charts = vec![system_chart(corpus)?];
    for day in corpus.report_days() {
        charts.push(process_chart(corpus, day)?);
    }
    info!(charts = charts.len(), "charts rendered");
    Ok(charts)
}

/// Writes the charts as a printable multi-page HTML document.
pub fn write_document(path: &Path, title: &str, charts: &[Chart]) -> Result<()> {
    let tmp = path.with_extension("html.part");
    write_pages(&tmp, title, charts).map_err(|e| ReportError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ReportError::io(path, e))
}

fn write_pages(path: &Path, title: &str, charts: &[Chart]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let title = escape_html(title);
    write!(out, r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{title}</title>
  <style>
    @page {{ size: {w}in {h}in; margin: 0; }}
    body {{ font-family: sans-serif; margin: 0; }}
    section.page {{ break-after: page; page-break-after: always; }}
    section.page:last-child {{ break-after: auto; page-break-after: auto; }}
    section.page svg {{ display: block; width: 100%; height: auto; }}
  </style>
</head>
<body>
"#, w = PAGE_INCHES.0, h = PAGE_INCHES.1)?;

    for (page, chart) in charts.iter().enumerate() {
        writeln!(
            out,
            r#"<section class="page" id="page-{}" title="{}">"#,
            page + 1,
            escape_html(chart.title())
        )?;
        writeln!(out, "{}", chart.svg())?;
        writeln!(out, "</section>")?;
    }

    writeln!(out, "</body>\n</html>")?;
    out.flush()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Runs a whole report and returns the path of the written document.
pub fn run(config: &ReportConfig) -> Result<PathBuf> {
    let window = ReportWindow::try_from(config.window_days)?;
    let logs = LogDirectory::new(&config.logs_dir);
    let staging = config.logs_dir.join(STAGING_DIR_NAME);

    info!(
        user = %config.user,
        window = %window,
        today = %config.today,
        logs = %config.logs_dir.display(),
        "building report"
    );

    let corpus = corpus::stage(&logs, &staging, window.days(), config.today)?;

    let out = config.output_dir.join(report_file_name(&config.user, window));
    let title = format!("{} - {} Day Performance Report", config.user, window.days());
    let written = build_charts(&corpus).and_then(|charts| write_document(&out, &title, &charts));
    if let Err(e) = written {
        warn!(staging = %staging.display(), "report failed, staging directory left in place");
        return Err(e);
    }

    if config.keep_staging {
        info!(staging = %staging.display(), "keeping staging directory");
    } else {
        fs::remove_dir_all(&staging).map_err(|e| ReportError::io(&staging, e))?;
    }

    info!(report = %out.display(), "report written");
    Ok(out)
}
