// perfmon_report - Rolling Window Performance Report
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
    # perfmon_report

    Turns a rolling window of daily perfmon log archives into one report:
    a system CPU/Memory trend chart followed by a top-process chart per day.

    Pipeline, each stage feeding the next:
    - [`archive`]: find archives and loose record files
    - [`corpus`]: stage the files covering the window
    - [`table`]: load staged CSVs into typed rows
    - [`transform`]: rank filter / process aggregation
    - [`chart`]: render SVG charts
    - [`report`]: assemble the pages into one document
*/

pub mod archive;
pub mod chart;
pub mod config;
pub mod corpus;
pub mod error;
pub mod report;
pub mod table;
pub mod transform;

pub use error::{ReportError, Result};
