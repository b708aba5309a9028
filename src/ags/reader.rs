//! AGS3 and AGS4 text parsing.
//!
//! Both editions are CSV-quoted line formats. AGS4 prefixes every line with a
//! descriptor (GROUP, HEADING, UNIT, TYPE, DATA). AGS3 opens groups with
//! `"**NAME"`, declares headings on `"*HEADING"` lines and uses `<UNITS>` and
//! `<CONT>` in the first cell for unit rows and continuation rows.

use super::{AgsFile, AgsGroup, AgsVersion};
use crate::constants::{ags3, ags4};
use crate::error::{AgsError, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Read and parse an AGS file from disk
pub fn read_ags_file(path: &Path) -> Result<AgsFile> {
    let bytes = std::fs::read(path)?;
    let text = decode_ags_bytes(&bytes);
    parse_ags_str(&text, path)
}

/// Decode file bytes as UTF-8, falling back to Latin-1 for legacy files
pub fn decode_ags_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("AGS content is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Parse AGS text; `path` is only used for error context
pub fn parse_ags_str(text: &str, path: &Path) -> Result<AgsFile> {
    let records = read_records(text, path)?;

    let version = detect_version(&records)
        .ok_or_else(|| AgsError::invalid_ags(path, "no AGS3 or AGS4 group marker found"))?;

    let groups = match version {
        AgsVersion::Ags4 => parse_ags4(&records, path)?,
        AgsVersion::Ags3 => parse_ags3(&records, path)?,
    };

    if groups.is_empty() {
        return Err(AgsError::invalid_ags(path, "file contains no groups"));
    }

    debug!(
        "Parsed {} {} groups from {}",
        groups.len(),
        version,
        path.display()
    );

    Ok(AgsFile {
        path: path.to_path_buf(),
        version,
        groups,
    })
}

/// A CSV record with its 1-based line number
struct Record {
    line: u64,
    fields: Vec<String>,
}

fn read_records(text: &str, path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AgsError::invalid_ags(path, e.to_string()))?;
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push(Record { line, fields });
    }

    Ok(records)
}

fn detect_version(records: &[Record]) -> Option<AgsVersion> {
    let first = records.first()?.fields.first()?;
    if first == ags4::GROUP {
        Some(AgsVersion::Ags4)
    } else if first.starts_with(ags3::GROUP_PREFIX) {
        Some(AgsVersion::Ags3)
    } else {
        None
    }
}

/// Append a finished group, merging repeated groups with identical headings
fn push_group(groups: &mut Vec<AgsGroup>, group: AgsGroup, path: &Path) -> Result<()> {
    if let Some(existing) = groups.iter_mut().find(|g| g.name == group.name) {
        if existing.headings != group.headings {
            return Err(AgsError::invalid_ags(
                path,
                format!("group {} repeated with different headings", group.name),
            ));
        }
        existing.rows.extend(group.rows);
        return Ok(());
    }
    groups.push(group);
    Ok(())
}

fn parse_ags4(records: &[Record], path: &Path) -> Result<Vec<AgsGroup>> {
    let mut groups = Vec::new();
    let mut current: Option<AgsGroup> = None;

    for record in records {
        let descriptor = record.fields[0].as_str();
        let rest = || record.fields[1..].to_vec();

        match descriptor {
            ags4::GROUP => {
                if let Some(group) = current.take() {
                    push_group(&mut groups, group, path)?;
                }
                let name = record.fields.get(1).cloned().unwrap_or_default();
                if name.is_empty() {
                    return Err(AgsError::invalid_ags(
                        path,
                        format!("line {}: GROUP without a name", record.line),
                    ));
                }
                current = Some(AgsGroup::new(name));
            }
            ags4::HEADING | ags4::UNIT | ags4::TYPE | ags4::DATA => {
                let group = current.as_mut().ok_or_else(|| {
                    AgsError::invalid_ags(
                        path,
                        format!("line {}: {} before any GROUP", record.line, descriptor),
                    )
                })?;
                match descriptor {
                    ags4::HEADING => group.headings = rest(),
                    ags4::UNIT => group.units = rest(),
                    ags4::TYPE => group.types = rest(),
                    _ => {
                        if group.headings.is_empty() {
                            return Err(AgsError::invalid_ags(
                                path,
                                format!(
                                    "line {}: DATA before HEADING in group {}",
                                    record.line, group.name
                                ),
                            ));
                        }
                        let row = rest();
                        if row.len() != group.headings.len() {
                            return Err(AgsError::invalid_ags(
                                path,
                                format!(
                                    "line {}: group {} has {} headings but row has {} values",
                                    record.line,
                                    group.name,
                                    group.headings.len(),
                                    row.len()
                                ),
                            ));
                        }
                        group.rows.push(row);
                    }
                }
            }
            other => {
                return Err(AgsError::invalid_ags(
                    path,
                    format!("line {}: unknown AGS4 descriptor '{}'", record.line, other),
                ));
            }
        }
    }

    if let Some(group) = current.take() {
        push_group(&mut groups, group, path)?;
    }

    Ok(groups)
}

fn strip_heading_marker(field: &str) -> String {
    field
        .trim_start_matches(ags3::HEADING_PREFIX)
        .trim_start_matches('?')
        .to_string()
}

fn parse_ags3(records: &[Record], path: &Path) -> Result<Vec<AgsGroup>> {
    let mut groups = Vec::new();
    let mut current: Option<AgsGroup> = None;
    let mut reading_headings = false;

    for record in records {
        let first = record.fields[0].as_str();

        if first.starts_with(ags3::GROUP_PREFIX) {
            if let Some(group) = current.take() {
                push_group(&mut groups, group, path)?;
            }
            current = Some(AgsGroup::new(first.trim_start_matches('*')));
            reading_headings = true;
            continue;
        }

        let group = current.as_mut().ok_or_else(|| {
            AgsError::invalid_ags(path, format!("line {}: data before any group", record.line))
        })?;

        // Heading lines may wrap onto several lines, each starting with '*'
        if reading_headings && first.starts_with(ags3::HEADING_PREFIX) {
            group.headings.extend(
                record
                    .fields
                    .iter()
                    .filter(|f| !f.is_empty())
                    .map(|f| strip_heading_marker(f)),
            );
            continue;
        }
        reading_headings = false;

        if group.headings.is_empty() {
            return Err(AgsError::invalid_ags(
                path,
                format!("line {}: group {} has no headings", record.line, group.name),
            ));
        }
        let width = group.headings.len();

        let mut cells = record.fields.clone();
        if cells.len() > width {
            return Err(AgsError::invalid_ags(
                path,
                format!(
                    "line {}: group {} has {} headings but row has {} values",
                    record.line,
                    group.name,
                    width,
                    cells.len()
                ),
            ));
        }
        if cells.len() < width {
            warn!(
                "Line {} of {}: padding short {} row ({} of {} values)",
                record.line,
                path.display(),
                group.name,
                cells.len(),
                width
            );
            cells.resize(width, String::new());
        }

        match first {
            ags3::UNITS => {
                cells[0] = String::new();
                group.units = cells;
            }
            ags3::CONT => {
                let previous = group.rows.last_mut().ok_or_else(|| {
                    AgsError::invalid_ags(
                        path,
                        format!("line {}: <CONT> without a preceding row", record.line),
                    )
                })?;
                for (target, extra) in previous.iter_mut().zip(cells).skip(1) {
                    if extra.is_empty() {
                        continue;
                    }
                    if !target.is_empty() {
                        target.push(' ');
                    }
                    target.push_str(&extra);
                }
            }
            _ => group.rows.push(cells),
        }
    }

    if let Some(group) = current.take() {
        push_group(&mut groups, group, path)?;
    }

    Ok(groups)
}
