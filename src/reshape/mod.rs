// src/reshape/mod.rs
//
// The wide-to-long transform. One report tab arrives as a human-authored
// table: merged group labels on the left, one pair of columns per reporting
// date (plan first, then actual under the identical label). This module turns
// that into one flat record per (work type, contractor, date, status) with
// the cell content carried through untouched.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;

use crate::fetch::RawSheet;

pub mod date;
pub mod layout;

pub use layout::SheetLayout;

/// Suffix tagged onto the first label of each duplicated pair.
const PLAN_SUFFIX: &str = "_plan";

/// The two leading group columns, in order.
const GROUP_LABELS: [&str; 2] = ["work type", "contractor"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Plan,
    Actual,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Plan => "plan",
            Status::Actual => "actual",
        }
    }
}

/// One normalized observation, the unit the fact table stores.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRecord {
    pub work_type: String,
    pub contractor: String,
    pub date: NaiveDate,
    pub status: Status,
    /// Reported measurement, kept as the source wrote it. The same column
    /// mixes numbers and blanks, so nothing is coerced here.
    pub value: String,
    pub object_id: String,
}

/// Reshape one raw export into fact records. Pure: no I/O, deterministic for
/// identical input. Emits exactly (data rows) x (date columns) records; the
/// only rows removed are the structural ones the layout names.
pub fn reshape(sheet: &RawSheet, object_id: &str, layout: &SheetLayout) -> Result<Vec<FactRecord>> {
    let header = build_header(sheet, layout)?;

    let mut body = body_rows(sheet, layout, header.len());
    for column in 0..GROUP_LABELS.len() {
        forward_fill(&mut body, column);
    }

    // rollup rows are removed only now, after the fill, so a group label they
    // carry still seeds the rows below them
    let body = body.into_iter().skip(layout.summary_rows);

    let mut records = Vec::new();
    for (export_row, row) in body {
        for (group_idx, group_label) in GROUP_LABELS.iter().enumerate() {
            if row[group_idx].is_empty() {
                bail!(
                    "sheet {}: row {} has an empty {} and no earlier row names one",
                    object_id,
                    export_row,
                    group_label
                );
            }
        }

        for (column, label) in header.iter().enumerate().skip(GROUP_LABELS.len()) {
            let (label, status) = match label.strip_suffix(PLAN_SUFFIX) {
                Some(stripped) => (stripped, Status::Plan),
                None => (label.as_str(), Status::Actual),
            };
            let date = date::parse_report_date(label).with_context(|| {
                format!(
                    "sheet {}: header column {}",
                    object_id,
                    column + layout.ignored_columns
                )
            })?;

            records.push(FactRecord {
                work_type: row[0].clone(),
                contractor: row[1].clone(),
                date,
                status,
                value: row.get(column).cloned().unwrap_or_default(),
                object_id: object_id.to_string(),
            });
        }
    }

    Ok(records)
}

/// Promote the header row: drop the structural columns, name the two group
/// columns the export leaves blank behind its merge formatting, and tag the
/// plan side of each duplicated date label.
fn build_header(sheet: &RawSheet, layout: &SheetLayout) -> Result<Vec<String>> {
    let raw = sheet.rows.get(layout.header_row).ok_or_else(|| {
        anyhow!(
            "header row {} is missing: the export has only {} rows",
            layout.header_row,
            sheet.rows.len()
        )
    })?;

    let mut header: Vec<String> = raw
        .iter()
        .skip(layout.ignored_columns)
        .map(|cell| cell.trim().to_string())
        .collect();

    if header.len() <= GROUP_LABELS.len() {
        bail!(
            "header row {} has {} usable columns, expected the group columns plus at least one reporting date",
            layout.header_row,
            header.len()
        );
    }
    for (idx, label) in GROUP_LABELS.iter().enumerate() {
        header[idx] = label.to_string();
    }

    mark_plan_columns(&mut header[GROUP_LABELS.len()..])?;
    Ok(header)
}

/// The source orders each date as a plan column immediately followed by an
/// actual column under the identical label. Suffix the first of each adjacent
/// pair so the labels stay distinct through the unpivot.
fn mark_plan_columns(labels: &mut [String]) -> Result<()> {
    for i in 0..labels.len().saturating_sub(1) {
        if labels[i] == labels[i + 1] {
            labels[i].push_str(PLAN_SUFFIX);
        }
    }

    // anything still duplicated is a label repeated three or more times, or a
    // plan/actual pair split by another column; either would merge unrelated
    // series downstream
    let mut seen = HashSet::new();
    for label in labels.iter() {
        if !seen.insert(label.as_str()) {
            bail!(
                "header label {:?} appears more than twice, or its plan/actual pair is not adjacent",
                label.trim_end_matches(PLAN_SUFFIX)
            );
        }
    }
    Ok(())
}

/// Collect the data region: every row the layout does not claim as title or
/// header, minus the header echo rows, stripped of the structural columns and
/// padded out to the header width. Each row keeps its export index for
/// diagnostics.
fn body_rows(sheet: &RawSheet, layout: &SheetLayout, width: usize) -> Vec<(usize, Vec<String>)> {
    sheet
        .rows
        .iter()
        .enumerate()
        .filter(|(index, _)| layout.is_body_row(*index))
        .skip(layout.header_echo_rows)
        .map(|(index, row)| {
            let mut cells: Vec<String> = row
                .iter()
                .skip(layout.ignored_columns)
                .map(|cell| cell.trim().to_string())
                .collect();
            if cells.len() < width {
                cells.resize(width, String::new());
            }
            (index, cells)
        })
        .collect()
}

/// Only the first row of a merged group carries its label in the export; copy
/// it down until the next labeled row, mirroring what the merge looked like
/// on screen.
fn forward_fill(rows: &mut [(usize, Vec<String>)], column: usize) {
    let mut last = String::new();
    for (_, row) in rows.iter_mut() {
        if row[column].is_empty() {
            row[column] = last.clone();
        } else {
            last = row[column].clone();
        }
    }
}
