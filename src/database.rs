//! Standardized database and the merge of several databases into one.

use crate::constants::columns;
use crate::error::{AgsError, Result};
use crate::frame::{
    concat_diagonal, drop_duplicate_keys, drop_duplicate_rows, filter_rows,
    replace_string_column, row_keys, string_values,
};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Tables of one or more AGS files in the standardized schema
#[derive(Debug, Clone)]
pub struct StandardizedDatabase {
    pub project: DataFrame,
    pub location: DataFrame,
    pub in_situ: BTreeMap<String, DataFrame>,
    pub sample: Option<DataFrame>,
    pub lab_tests: BTreeMap<String, DataFrame>,
    pub other: BTreeMap<String, DataFrame>,
}

impl StandardizedDatabase {
    pub fn location_count(&self) -> usize {
        self.location.height()
    }

    /// Row counts per in-situ group
    pub fn in_situ_counts(&self) -> BTreeMap<String, usize> {
        self.in_situ
            .iter()
            .map(|(name, df)| (name.clone(), df.height()))
            .collect()
    }

    /// Horizontal and vertical CRS identifiers of the first project row
    pub fn crs_identifiers(&self) -> Result<(String, String)> {
        let first = |name: &str| -> Result<String> {
            string_values(&self.project, "Project", name)?
                .into_iter()
                .next()
                .flatten()
                .ok_or_else(|| AgsError::column_not_found("Project", name))
        };
        Ok((first(columns::HORIZONTAL_CRS)?, first(columns::VERTICAL_CRS)?))
    }
}

/// Merge databases in order into one with globally unique `location_uid`s.
///
/// A location row identical to one already merged collapses into it. A
/// different row reusing a merged `location_uid` is renamed to the first free
/// `{uid}_{n}` and the rows of its own database referencing it follow.
pub fn merge_databases(databases: Vec<StandardizedDatabase>) -> Result<StandardizedDatabase> {
    if databases.is_empty() {
        return Err(AgsError::configuration("no databases to merge"));
    }
    if databases.len() == 1 {
        return databases
            .into_iter()
            .next()
            .ok_or_else(|| AgsError::configuration("no databases to merge"));
    }

    let (horizontal, vertical) = databases[0].crs_identifiers()?;
    for db in &databases[1..] {
        let (h, v) = db.crs_identifiers()?;
        if h != horizontal || v != vertical {
            return Err(AgsError::CrsMismatch {
                expected: format!("{} + {}", horizontal, vertical),
                found: format!("{} + {}", h, v),
            });
        }
    }

    let mut merger = LocationMerger::default();
    let mut projects = Vec::new();
    let mut locations = Vec::new();
    let mut in_situ: BTreeMap<String, Vec<DataFrame>> = BTreeMap::new();
    let mut samples = Vec::new();
    let mut lab_tests: BTreeMap<String, Vec<DataFrame>> = BTreeMap::new();
    let mut other: BTreeMap<String, Vec<DataFrame>> = BTreeMap::new();

    for db in databases {
        projects.push(db.project);

        let (location, renames) = merger.admit(&db.location)?;
        locations.push(location);

        for (name, table) in db.in_situ {
            let table = remap_location_uids(table, &name, &renames)?;
            in_situ.entry(name).or_default().push(table);
        }
        if let Some(sample) = db.sample {
            samples.push(remap_location_uids(sample, "SAMP", &renames)?);
        }
        for (name, table) in db.lab_tests {
            let table = remap_location_uids(table, &name, &renames)?;
            lab_tests.entry(name).or_default().push(table);
        }
        for (name, table) in db.other {
            other.entry(name).or_default().push(table);
        }
    }

    let project =
        drop_duplicate_keys(&concat_diagonal(projects)?, "Project", columns::PROJECT_UID)?;
    let location = concat_diagonal(locations)?;

    let merged = StandardizedDatabase {
        project,
        location,
        in_situ: concat_groups(in_situ)?,
        sample: if samples.is_empty() {
            None
        } else {
            Some(drop_duplicate_rows(&concat_diagonal(samples)?)?)
        },
        lab_tests: concat_groups(lab_tests)?,
        other: concat_groups(other)?,
    };

    info!(
        "Merged database: {} projects, {} locations, {} in-situ groups",
        merged.project.height(),
        merged.location.height(),
        merged.in_situ.len()
    );

    Ok(merged)
}

fn concat_groups(groups: BTreeMap<String, Vec<DataFrame>>) -> Result<BTreeMap<String, DataFrame>> {
    let mut merged = BTreeMap::new();
    for (name, frames) in groups {
        let table = drop_duplicate_rows(&concat_diagonal(frames)?)?;
        debug!("Merged group {}: {} rows", name, table.height());
        merged.insert(name, table);
    }
    Ok(merged)
}

/// Tracks the location rows merged so far
#[derive(Default)]
struct LocationMerger {
    /// Source uid to the distinct rows seen under it and the uid each was given
    rows: HashMap<String, Vec<(String, String)>>,
    used: HashSet<String>,
}

impl LocationMerger {
    /// Returns the rows of `location` to keep, with renamed uids applied, and
    /// the renames made for this database
    fn admit(&mut self, location: &DataFrame) -> Result<(DataFrame, HashMap<String, String>)> {
        let uids = string_values(location, "Location", columns::LOCATION_UID)?;
        let keys = row_keys(location)?;

        let mut keep = Vec::with_capacity(uids.len());
        let mut new_uids = Vec::with_capacity(uids.len());
        let mut renames = HashMap::new();

        for (uid, key) in uids.into_iter().zip(keys) {
            let uid =
                uid.ok_or_else(|| AgsError::column_not_found("Location", columns::LOCATION_UID))?;

            let merged = self
                .rows
                .get(&uid)
                .and_then(|seen| seen.iter().find(|(seen_key, _)| *seen_key == key))
                .map(|(_, assigned)| assigned.clone());

            if let Some(assigned) = merged {
                debug!("Location {} delivered twice, keeping one row as {}", uid, assigned);
                if assigned != uid {
                    renames.insert(uid, assigned.clone());
                }
                keep.push(false);
                new_uids.push(Some(assigned));
                continue;
            }

            let assigned = if self.used.contains(&uid) {
                let renamed = self.free_uid(&uid);
                warn!(
                    "Location {} differs from an earlier location with the same id, renamed to {}",
                    uid, renamed
                );
                renames.insert(uid.clone(), renamed.clone());
                renamed
            } else {
                uid.clone()
            };

            self.used.insert(assigned.clone());
            self.rows
                .entry(uid)
                .or_default()
                .push((key, assigned.clone()));
            keep.push(true);
            new_uids.push(Some(assigned));
        }

        let mut location = location.clone();
        if !renames.is_empty() {
            replace_string_column(&mut location, columns::LOCATION_UID, new_uids)?;
        }
        let location = if keep.iter().all(|k| *k) {
            location
        } else {
            filter_rows(&location, &keep)?
        };

        Ok((location, renames))
    }

    fn free_uid(&self, uid: &str) -> String {
        (2..)
            .map(|n| format!("{}_{}", uid, n))
            .find(|candidate| !self.used.contains(candidate))
            .unwrap_or_else(|| uid.to_string())
    }
}

/// Apply location renames to `location_uid` and to `sample_uid` suffixes
fn remap_location_uids(
    mut table: DataFrame,
    name: &str,
    renames: &HashMap<String, String>,
) -> Result<DataFrame> {
    if renames.is_empty() || !crate::frame::has_column(&table, columns::LOCATION_UID) {
        return Ok(table);
    }

    let uids = string_values(&table, name, columns::LOCATION_UID)?;

    if crate::frame::has_column(&table, columns::SAMPLE_UID) {
        let samples = string_values(&table, name, columns::SAMPLE_UID)?;
        let remapped = samples
            .into_iter()
            .zip(&uids)
            .map(|(sample, uid)| match (sample, uid.as_ref().and_then(|u| renames.get(u))) {
                (Some(sample), Some(renamed)) => {
                    let old = uid.as_deref().unwrap_or_default();
                    Some(match sample.strip_suffix(old) {
                        Some(prefix) => format!("{}{}", prefix, renamed),
                        None => sample,
                    })
                }
                (sample, _) => sample,
            })
            .collect();
        replace_string_column(&mut table, columns::SAMPLE_UID, remapped)?;
    }

    let remapped = uids
        .into_iter()
        .map(|uid| uid.map(|u| renames.get(&u).cloned().unwrap_or(u)))
        .collect();
    replace_string_column(&mut table, columns::LOCATION_UID, remapped)?;

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{float_column, string_column};

    fn strings(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn database(project: &str, holes: &[(&str, f64)], horizontal: &str) -> StandardizedDatabase {
        let n = holes.len();
        let uids: Vec<String> = holes.iter().map(|(id, _)| format!("{}_{}", id, project)).collect();
        let uid_refs: Vec<&str> = uids.iter().map(String::as_str).collect();

        let project_df = DataFrame::new(vec![
            string_column(columns::PROJECT_UID, strings(&[project])),
            string_column(columns::HORIZONTAL_CRS, strings(&[horizontal])),
            string_column(columns::VERTICAL_CRS, strings(&["EPSG:5738"])),
        ])
        .unwrap();

        let location = DataFrame::new(vec![
            string_column(columns::LOCATION_UID, strings(&uid_refs)),
            string_column(columns::PROJECT_UID, vec![Some(project.to_string()); n]),
            float_column(
                columns::GROUND_LEVEL_ELEVATION,
                holes.iter().map(|(_, gl)| Some(*gl)).collect(),
            ),
        ])
        .unwrap();

        let geol = DataFrame::new(vec![
            string_column(columns::LOCATION_UID, strings(&uid_refs)),
            float_column(columns::DEPTH_TO_TOP, vec![Some(0.0); n]),
        ])
        .unwrap();

        let sample_uids: Vec<String> = uids.iter().map(|u| format!("1_U_1.5_{}", u)).collect();
        let sample_refs: Vec<&str> = sample_uids.iter().map(String::as_str).collect();
        let sample = DataFrame::new(vec![
            string_column(columns::SAMPLE_UID, strings(&sample_refs)),
            string_column(columns::LOCATION_UID, strings(&uid_refs)),
        ])
        .unwrap();

        StandardizedDatabase {
            project: project_df,
            location,
            in_situ: BTreeMap::from([("GEOL".to_string(), geol)]),
            sample: Some(sample),
            lab_tests: BTreeMap::new(),
            other: BTreeMap::new(),
        }
    }

    #[test]
    fn test_merge_distinct_projects() {
        let merged = merge_databases(vec![
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
            database("P2", &[("BH1", 2.0)], "EPSG:2326"),
        ])
        .unwrap();

        assert_eq!(merged.project.height(), 2);
        assert_eq!(
            string_values(&merged.location, "Location", columns::LOCATION_UID).unwrap(),
            strings(&["BH1_P1", "BH1_P2"])
        );
        assert_eq!(merged.in_situ["GEOL"].height(), 2);
    }

    #[test]
    fn test_identical_location_collapses() {
        let merged = merge_databases(vec![
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
        ])
        .unwrap();

        assert_eq!(merged.project.height(), 1);
        assert_eq!(merged.location.height(), 1);
        assert_eq!(merged.in_situ["GEOL"].height(), 1);
        assert_eq!(merged.sample.unwrap().height(), 1);
    }

    #[test]
    fn test_conflicting_location_is_renamed() {
        let merged = merge_databases(vec![
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
            database("P1", &[("BH1", 5.0)], "EPSG:2326"),
            database("P1", &[("BH1", 7.0)], "EPSG:2326"),
        ])
        .unwrap();

        assert_eq!(
            string_values(&merged.location, "Location", columns::LOCATION_UID).unwrap(),
            strings(&["BH1_P1", "BH1_P1_2", "BH1_P1_3"])
        );
        assert_eq!(
            string_values(&merged.in_situ["GEOL"], "GEOL", columns::LOCATION_UID).unwrap(),
            strings(&["BH1_P1", "BH1_P1_2", "BH1_P1_3"])
        );
        let sample = merged.sample.unwrap();
        assert_eq!(
            string_values(&sample, "SAMP", columns::SAMPLE_UID).unwrap(),
            strings(&["1_U_1.5_BH1_P1", "1_U_1.5_BH1_P1_2", "1_U_1.5_BH1_P1_3"])
        );
    }

    #[test]
    fn test_crs_mismatch() {
        let result = merge_databases(vec![
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
            database("P2", &[("BH1", 1.0)], "EPSG:27700"),
        ]);
        assert!(matches!(result, Err(AgsError::CrsMismatch { .. })));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            merge_databases(Vec::new()),
            Err(AgsError::Configuration { .. })
        ));
    }

    #[test]
    fn test_single_database_passes_through() {
        let db = database("P1", &[("BH1", 1.0), ("BH2", 2.0)], "EPSG:2326");
        let merged = merge_databases(vec![db]).unwrap();
        assert_eq!(merged.location_count(), 2);
        assert_eq!(merged.in_situ_counts()["GEOL"], 2);
    }

    #[test]
    fn test_renamed_uid_is_not_reused() {
        let merged = merge_databases(vec![
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
            database("P1", &[("BH1", 5.0)], "EPSG:2326"),
            database("P1_2", &[("BH1", 9.0)], "EPSG:2326"),
        ])
        .unwrap();

        let uids = string_values(&merged.location, "Location", columns::LOCATION_UID).unwrap();
        assert_eq!(uids, strings(&["BH1_P1", "BH1_P1_2", "BH1_P1_2_2"]));
        let unique: HashSet<_> = uids.iter().collect();
        assert_eq!(unique.len(), merged.location.height());

        assert_eq!(
            string_values(&merged.in_situ["GEOL"], "GEOL", columns::LOCATION_UID).unwrap(),
            strings(&["BH1_P1", "BH1_P1_2", "BH1_P1_2_2"])
        );
    }

    #[test]
    fn test_repeat_of_renamed_location_collapses() {
        let merged = merge_databases(vec![
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
            database("P1", &[("BH1", 5.0)], "EPSG:2326"),
            database("P1", &[("BH1", 5.0)], "EPSG:2326"),
            database("P1", &[("BH1", 1.0)], "EPSG:2326"),
        ])
        .unwrap();

        assert_eq!(merged.location.height(), 2);
        assert_eq!(
            string_values(&merged.location, "Location", columns::LOCATION_UID).unwrap(),
            strings(&["BH1_P1", "BH1_P1_2"])
        );
        // rows of the repeated delivery follow the renamed borehole
        assert_eq!(
            string_values(&merged.in_situ["GEOL"], "GEOL", columns::LOCATION_UID).unwrap(),
            strings(&["BH1_P1", "BH1_P1_2"])
        );
        assert_eq!(
            string_values(merged.sample.as_ref().unwrap(), "SAMP", columns::SAMPLE_UID).unwrap(),
            strings(&["1_U_1.5_BH1_P1", "1_U_1.5_BH1_P1_2"])
        );
    }
}
