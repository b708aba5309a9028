//! Per-file conversion from raw AGS groups to the standardized schema.
//!
//! Conversion runs in two steps. [`ags_to_mapping`] reads the file and records
//! which raw columns play which standardized role; [`map_to_database`]
//! materializes the standardized tables from that mapping.

use crate::ags::{AgsFile, AgsGroup, AgsVersion, group_to_dataframe, read_ags_file};
use crate::constants::{
    BASE_DEPTH_SUFFIXES, PROJECT_ID_HEADING, TOP_DEPTH_SUFFIXES, columns, groups,
    sample_headings,
};
use crate::crs::CrsPair;
use crate::database::StandardizedDatabase;
use crate::error::{AgsError, Result};
use crate::frame::{
    float_column, optional_float_values, prepend_columns, string_column, string_values,
};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Project table mapping
#[derive(Debug, Clone)]
pub struct ProjectMapping {
    pub project_uid: String,
    pub crs: CrsPair,
    /// Raw PROJ group, None when the file has no PROJ group
    pub data: Option<DataFrame>,
}

/// Location table mapping
#[derive(Debug, Clone)]
pub struct LocationMapping {
    pub data: DataFrame,
    pub location_id_column: String,
    pub location_type_column: Option<String>,
    pub easting_column: String,
    pub northing_column: String,
    pub ground_level_column: String,
    pub depth_to_base_column: Option<String>,
}

/// Mapping of a group whose rows belong to a location at a depth
#[derive(Debug, Clone)]
pub struct DepthTableMapping {
    pub table_name: String,
    pub data: DataFrame,
    pub location_id_column: String,
    pub depth_to_top_column: Option<String>,
    pub depth_to_base_column: Option<String>,
}

/// Mapping of a group without a location reference
#[derive(Debug, Clone)]
pub struct OtherTableMapping {
    pub table_name: String,
    pub data: DataFrame,
}

/// Everything needed to build a standardized database from one file
#[derive(Debug, Clone)]
pub struct DatabaseMapping {
    pub source: PathBuf,
    pub version: AgsVersion,
    pub project: ProjectMapping,
    pub location: LocationMapping,
    pub in_situ: Vec<DepthTableMapping>,
    pub sample: Option<DepthTableMapping>,
    pub lab_tests: Vec<DepthTableMapping>,
    pub other: Vec<OtherTableMapping>,
}

/// Read one AGS file and build its mapping to the standardized schema
pub fn ags_to_mapping(
    path: &Path,
    horizontal_crs: &str,
    vertical_crs: &str,
) -> Result<DatabaseMapping> {
    let crs = CrsPair::from_identifiers(horizontal_crs, vertical_crs)?;
    let ags = read_ags_file(path)?;
    ags_file_to_mapping(&ags, crs)
}

/// Build the mapping for an already parsed file
pub fn ags_file_to_mapping(ags: &AgsFile, crs: CrsPair) -> Result<DatabaseMapping> {
    let path = ags.path.as_path();
    let location_group_name = ags.version.location_group();
    let location_id = ags.version.location_id_heading();

    let project = project_mapping(ags, crs)?;

    let location_group = ags
        .group(location_group_name)
        .ok_or_else(|| AgsError::MissingGroup {
            path: path.to_path_buf(),
            group: location_group_name.to_string(),
        })?;
    let location = location_mapping(location_group, location_id, path)?;

    let mut in_situ = Vec::new();
    let mut lab_tests = Vec::new();
    let mut other = Vec::new();
    let mut sample = None;

    for group in &ags.groups {
        let name = group.name.as_str();
        if name == groups::PROJECT || name == location_group_name {
            continue;
        }

        if !group.has_heading(location_id) {
            other.push(OtherTableMapping {
                table_name: group.name.clone(),
                data: group_to_dataframe(group)?,
            });
            continue;
        }

        if name == groups::SAMPLE {
            sample = Some(depth_table_mapping(group, location_id)?);
        } else if is_lab_test_group(group) {
            lab_tests.push(depth_table_mapping(group, location_id)?);
        } else {
            in_situ.push(depth_table_mapping(group, location_id)?);
        }
    }

    debug!(
        "Mapped {}: {} in-situ, {} lab, {} other groups",
        path.display(),
        in_situ.len(),
        lab_tests.len(),
        other.len()
    );

    Ok(DatabaseMapping {
        source: path.to_path_buf(),
        version: ags.version,
        project,
        location,
        in_situ,
        sample,
        lab_tests,
        other,
    })
}

fn project_mapping(ags: &AgsFile, crs: CrsPair) -> Result<ProjectMapping> {
    let proj = ags.group(groups::PROJECT);

    let project_id = proj
        .and_then(|g| g.values(PROJECT_ID_HEADING))
        .and_then(|values| values.first().map(|v| v.to_string()))
        .filter(|id| !id.is_empty());

    let project_uid = match project_id {
        Some(id) => id,
        None => {
            let stem = ags
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "project".to_string());
            warn!(
                "No PROJ_ID in {}, using file name '{}' as project identifier",
                ags.path.display(),
                stem
            );
            stem
        }
    };

    let data = match proj {
        Some(group) => Some(group_to_dataframe(group)?.head(Some(1))),
        None => None,
    };

    Ok(ProjectMapping {
        project_uid,
        crs,
        data,
    })
}

fn location_mapping(group: &AgsGroup, location_id: &str, path: &Path) -> Result<LocationMapping> {
    let prefix = &group.name;
    let required = |suffix: &str| -> Result<String> {
        let heading = format!("{}_{}", prefix, suffix);
        if group.has_heading(&heading) {
            Ok(heading)
        } else {
            Err(AgsError::invalid_ags(
                path,
                format!("group {} has no {} heading", prefix, heading),
            ))
        }
    };
    let optional = |suffix: &str| -> Option<String> {
        let heading = format!("{}_{}", prefix, suffix);
        group.has_heading(&heading).then_some(heading)
    };

    Ok(LocationMapping {
        data: group_to_dataframe(group)?,
        location_id_column: location_id.to_string(),
        location_type_column: optional("TYPE"),
        easting_column: required("NATE")?,
        northing_column: required("NATN")?,
        ground_level_column: required("GL")?,
        depth_to_base_column: optional("FDEP"),
    })
}

fn first_heading(group: &AgsGroup, suffixes: &[&str]) -> Option<String> {
    suffixes
        .iter()
        .map(|suffix| format!("{}{}", group.name, suffix))
        .find(|heading| group.has_heading(heading))
}

fn is_lab_test_group(group: &AgsGroup) -> bool {
    group.has_heading(sample_headings::TOP) || group.has_heading(sample_headings::SPECIMEN_DEPTH)
}

fn depth_table_mapping(group: &AgsGroup, location_id: &str) -> Result<DepthTableMapping> {
    let depth_to_top_column = if is_lab_test_group(group) || group.name == groups::SAMPLE {
        [sample_headings::TOP, sample_headings::SPECIMEN_DEPTH]
            .into_iter()
            .find(|h| group.has_heading(h))
            .map(str::to_string)
    } else {
        first_heading(group, TOP_DEPTH_SUFFIXES)
    };

    Ok(DepthTableMapping {
        table_name: group.name.clone(),
        data: group_to_dataframe(group)?,
        location_id_column: location_id.to_string(),
        depth_to_top_column,
        depth_to_base_column: first_heading(group, BASE_DEPTH_SUFFIXES),
    })
}

pub fn location_uid(location_id: &str, project_uid: &str) -> String {
    format!("{}_{}", location_id, project_uid)
}

/// Materialize the standardized database described by a mapping
pub fn map_to_database(mapping: DatabaseMapping) -> Result<StandardizedDatabase> {
    let project_uid = mapping.project.project_uid.clone();

    let project = project_table(&mapping.project)?;
    let location = location_table(&mapping.location, &project_uid, &mapping.source)?;

    let mut in_situ = BTreeMap::new();
    for table in &mapping.in_situ {
        in_situ.insert(
            table.table_name.clone(),
            depth_table(table, &project_uid, false)?,
        );
    }

    let sample = match &mapping.sample {
        Some(table) => Some(depth_table(table, &project_uid, true)?),
        None => None,
    };

    let mut lab_tests = BTreeMap::new();
    for table in &mapping.lab_tests {
        lab_tests.insert(
            table.table_name.clone(),
            depth_table(table, &project_uid, true)?,
        );
    }

    let mut other = BTreeMap::new();
    for table in &mapping.other {
        let uids = vec![Some(project_uid.clone()); table.data.height()];
        other.insert(
            table.table_name.clone(),
            prepend_columns(vec![string_column(columns::PROJECT_UID, uids)], &table.data)?,
        );
    }

    Ok(StandardizedDatabase {
        project,
        location,
        in_situ,
        sample,
        lab_tests,
        other,
    })
}

/// Convert one file: mapping then materialization
pub fn convert_ags_file(
    path: &Path,
    horizontal_crs: &str,
    vertical_crs: &str,
) -> Result<StandardizedDatabase> {
    let mapping = ags_to_mapping(path, horizontal_crs, vertical_crs)?;
    map_to_database(mapping)
}

fn project_table(project: &ProjectMapping) -> Result<DataFrame> {
    let leading = vec![
        string_column(columns::PROJECT_UID, vec![Some(project.project_uid.clone())]),
        string_column(
            columns::HORIZONTAL_CRS,
            vec![Some(project.crs.horizontal.identifier())],
        ),
        string_column(
            columns::VERTICAL_CRS,
            vec![Some(project.crs.vertical.identifier())],
        ),
    ];
    match &project.data {
        Some(raw) if raw.height() == 1 => prepend_columns(leading, raw),
        _ => Ok(DataFrame::new(leading)?),
    }
}

fn location_table(
    location: &LocationMapping,
    project_uid: &str,
    source: &Path,
) -> Result<DataFrame> {
    let height = location.data.height();
    let data = &location.data;
    let ids = string_values(data, "Location", &location.location_id_column)?;

    let mut seen = HashSet::new();
    let mut source_ids = Vec::with_capacity(height);
    for id in ids {
        let id = id.ok_or_else(|| AgsError::MissingField {
            path: source.to_path_buf(),
            location_id: "<blank>".to_string(),
            field: location.location_id_column.clone(),
        })?;
        if !seen.insert(id.clone()) {
            return Err(AgsError::DuplicateLocation {
                path: source.to_path_buf(),
                location_id: id,
            });
        }
        source_ids.push(id);
    }

    let required_floats = |column: &str| -> Result<Vec<Option<f64>>> {
        let values = optional_float_values(data, "Location", Some(column))?;
        if let Some(index) = values.iter().position(Option::is_none) {
            return Err(AgsError::MissingField {
                path: source.to_path_buf(),
                location_id: source_ids[index].clone(),
                field: column.to_string(),
            });
        }
        Ok(values)
    };

    let easting = required_floats(&location.easting_column)?;
    let northing = required_floats(&location.northing_column)?;
    let ground_level = required_floats(&location.ground_level_column)?;
    let depth_to_base =
        optional_float_values(data, "Location", location.depth_to_base_column.as_deref())?;

    let location_type = match &location.location_type_column {
        Some(column) => string_values(data, "Location", column)?,
        None => vec![None; height],
    };

    let uids = source_ids
        .iter()
        .map(|id| Some(location_uid(id, project_uid)))
        .collect();

    let leading = vec![
        string_column(columns::LOCATION_UID, uids),
        string_column(columns::PROJECT_UID, vec![Some(project_uid.to_string()); height]),
        string_column(
            columns::LOCATION_SOURCE_ID,
            source_ids.into_iter().map(Some).collect(),
        ),
        string_column(columns::LOCATION_TYPE, location_type),
        float_column(columns::EASTING, easting),
        float_column(columns::NORTHING, northing),
        float_column(columns::GROUND_LEVEL_ELEVATION, ground_level),
        float_column(columns::DEPTH_TO_BASE, depth_to_base),
    ];

    prepend_columns(leading, data)
}

/// Sample identifier built from the sample headings and the owning location
fn sample_uid(
    data: &DataFrame,
    table: &str,
    location_uids: &[Option<String>],
) -> Result<Vec<Option<String>>> {
    let mut parts = Vec::new();
    for heading in [
        sample_headings::REFERENCE,
        sample_headings::TYPE,
        sample_headings::TOP,
    ] {
        if crate::frame::has_column(data, heading) {
            parts.push(string_values(data, table, heading)?);
        }
    }

    Ok(location_uids
        .iter()
        .enumerate()
        .map(|(row, location_uid)| {
            let location_uid = location_uid.as_ref()?;
            let mut pieces: Vec<String> = parts
                .iter()
                .map(|values| values[row].clone().unwrap_or_default())
                .collect();
            pieces.push(location_uid.clone());
            Some(pieces.join("_"))
        })
        .collect())
}

fn depth_table(
    table: &DepthTableMapping,
    project_uid: &str,
    with_sample_uid: bool,
) -> Result<DataFrame> {
    let data = &table.data;
    let name = table.table_name.as_str();
    let height = data.height();

    let ids = string_values(data, name, &table.location_id_column)?;
    let blank = ids.iter().filter(|id| id.is_none()).count();
    if blank > 0 {
        warn!("{} rows of {} have no location identifier", blank, name);
    }
    let location_uids: Vec<Option<String>> = ids
        .iter()
        .map(|id| id.as_deref().map(|id| location_uid(id, project_uid)))
        .collect();

    let mut leading = Vec::new();
    if with_sample_uid {
        leading.push(string_column(
            columns::SAMPLE_UID,
            sample_uid(data, name, &location_uids)?,
        ));
    }
    leading.push(string_column(
        columns::PROJECT_UID,
        vec![Some(project_uid.to_string()); height],
    ));
    leading.push(string_column(columns::LOCATION_UID, location_uids));
    leading.push(float_column(
        columns::DEPTH_TO_TOP,
        optional_float_values(data, name, table.depth_to_top_column.as_deref())?,
    ));
    leading.push(float_column(
        columns::DEPTH_TO_BASE,
        optional_float_values(data, name, table.depth_to_base_column.as_deref())?,
    ));

    prepend_columns(leading, data)
}
