//! Geometry derivation for locations and depth-referenced rows.

use crate::constants::columns;
use crate::crs::CrsPair;
use crate::database::StandardizedDatabase;
use crate::error::Result;
use crate::frame::{
    float_column, float_values, has_column, optional_float_values, string_column, string_values,
};
use geo::{Coord, LineString, Point};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Planar `geo` shape with an elevation for each vertex.
///
/// x/y are easting/northing or longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point { point: Point<f64>, z: f64 },
    LineString { line: LineString<f64>, z: Vec<f64> },
}

impl Geometry {
    pub fn point(coord: Coord<f64>, z: f64) -> Self {
        Geometry::Point {
            point: Point::from(coord),
            z,
        }
    }

    pub fn line(vertices: impl IntoIterator<Item = (Coord<f64>, f64)>) -> Self {
        let (coords, z): (Vec<Coord<f64>>, Vec<f64>) = vertices.into_iter().unzip();
        Geometry::LineString {
            line: LineString::new(coords),
            z,
        }
    }

    /// GeoJSON geometry with the elevation as third position value
    pub fn to_geojson(&self) -> geojson::Geometry {
        let value = match self {
            Geometry::Point { point, z } => geojson::Value::Point(vec![point.x(), point.y(), *z]),
            Geometry::LineString { line, z } => geojson::Value::LineString(
                line.coords()
                    .zip(z)
                    .map(|(c, z)| vec![c.x, c.y, *z])
                    .collect(),
            ),
        };
        geojson::Geometry::new(value)
    }
}

/// Straight borehole path from its collar.
///
/// Azimuth is degrees clockwise from grid north, inclination degrees below
/// horizontal (90 is vertical).
#[derive(Debug, Clone, Copy)]
pub struct Trajectory {
    pub collar: Coord<f64>,
    pub collar_elevation: f64,
    pub azimuth: f64,
    pub inclination: f64,
}

impl Trajectory {
    pub fn vertical(collar: Coord<f64>, collar_elevation: f64) -> Self {
        Self {
            collar,
            collar_elevation,
            azimuth: 0.0,
            inclination: 90.0,
        }
    }

    /// Position and elevation at a depth measured along the hole
    pub fn point_at(&self, depth: f64) -> (Coord<f64>, f64) {
        let incl = self.inclination.to_radians();
        let az = self.azimuth.to_radians();
        let horizontal = depth * incl.cos();
        let offset = Coord {
            x: horizontal * az.sin(),
            y: horizontal * az.cos(),
        };
        (self.collar + offset, self.collar_elevation - depth * incl.sin())
    }

    /// Point at `top`, or a line from `top` to `base` when base is deeper
    pub fn geometry_between(&self, top: Option<f64>, base: Option<f64>) -> Option<Geometry> {
        match (top, base) {
            (Some(top), Some(base)) if base > top => {
                Some(Geometry::line([self.point_at(top), self.point_at(base)]))
            }
            (Some(depth), _) | (None, Some(depth)) => {
                let (coord, z) = self.point_at(depth);
                Some(Geometry::point(coord, z))
            }
            (None, None) => None,
        }
    }
}

/// Table with one optional geometry per row
#[derive(Debug, Clone)]
pub struct GeoFrame {
    pub frame: DataFrame,
    pub geometry: Vec<Option<Geometry>>,
}

impl GeoFrame {
    pub fn new(frame: DataFrame, geometry: Vec<Option<Geometry>>) -> Self {
        debug_assert_eq!(frame.height(), geometry.len());
        Self { frame, geometry }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

#[derive(Debug, Clone)]
pub struct GeospatialDatabase {
    pub crs: CrsPair,
    pub project: DataFrame,
    pub location: GeoFrame,
    pub lon_lat_height: GeoFrame,
    pub in_situ: BTreeMap<String, GeoFrame>,
    pub sample: Option<GeoFrame>,
    pub lab_tests: BTreeMap<String, GeoFrame>,
    pub other: BTreeMap<String, DataFrame>,
}

/// Derive location lines, the WGS84 LonLatHeight table and the geometry of
/// every depth-referenced row
pub fn create_geodatabase(db: &StandardizedDatabase) -> Result<GeospatialDatabase> {
    let (horizontal, vertical) = db.crs_identifiers()?;
    let crs = CrsPair::from_identifiers(&horizontal, &vertical)?;

    let location = &db.location;
    let uids = string_values(location, "Location", columns::LOCATION_UID)?;
    let project_uids = string_values(location, "Location", columns::PROJECT_UID)?;
    let easting = float_values(location, "Location", columns::EASTING)?;
    let northing = float_values(location, "Location", columns::NORTHING)?;
    let ground_level = float_values(location, "Location", columns::GROUND_LEVEL_ELEVATION)?;
    let final_depth = optional_float_values(location, "Location", Some(columns::DEPTH_TO_BASE))?;
    let azimuth = heading_values(location, "_ORNT")?;
    let inclination = heading_values(location, "_INCL")?;

    let mut trajectories = HashMap::new();
    let mut location_geometry = Vec::with_capacity(location.height());
    let mut longitude = Vec::with_capacity(location.height());
    let mut latitude = Vec::with_capacity(location.height());
    let mut egm2008 = Vec::with_capacity(location.height());
    let mut lon_lat_geometry = Vec::with_capacity(location.height());

    for row in 0..location.height() {
        let (Some(e), Some(n), Some(gl)) = (easting[row], northing[row], ground_level[row]) else {
            warn!("Location {:?} has no collar coordinates", uids[row]);
            location_geometry.push(None);
            longitude.push(None);
            latitude.push(None);
            egm2008.push(None);
            lon_lat_geometry.push(None);
            continue;
        };

        let collar = Coord { x: e, y: n };
        let mut trajectory = Trajectory::vertical(collar, gl);
        if let Some(az) = azimuth[row] {
            trajectory.azimuth = az;
        }
        if let Some(incl) = inclination[row] {
            trajectory.inclination = incl;
        }

        let geometry = match final_depth[row] {
            Some(depth) if depth > 0.0 => {
                Geometry::line([(collar, gl), trajectory.point_at(depth)])
            }
            _ => Geometry::point(collar, gl),
        };
        location_geometry.push(Some(geometry));

        let (lon, lat) = crs.horizontal.to_wgs84(e, n);
        let height = crs.vertical.to_egm2008(gl);
        longitude.push(Some(lon));
        latitude.push(Some(lat));
        egm2008.push(Some(height));
        lon_lat_geometry.push(Some(Geometry::point(Coord { x: lon, y: lat }, height)));

        if let Some(uid) = &uids[row] {
            trajectories.insert(uid.clone(), trajectory);
        }
    }

    let lon_lat_height = DataFrame::new(vec![
        string_column(columns::PROJECT_UID, project_uids),
        string_column(columns::LOCATION_UID, uids),
        float_column(columns::LONGITUDE, longitude),
        float_column(columns::LATITUDE, latitude),
        float_column(columns::EGM2008_GROUND_LEVEL_HEIGHT, egm2008),
    ])?;

    let mut in_situ = BTreeMap::new();
    for (name, table) in &db.in_situ {
        in_situ.insert(name.clone(), locate_rows(table, name, &trajectories)?);
    }
    let mut lab_tests = BTreeMap::new();
    for (name, table) in &db.lab_tests {
        lab_tests.insert(name.clone(), locate_rows(table, name, &trajectories)?);
    }
    let sample = match &db.sample {
        Some(table) => Some(locate_rows(table, "SAMP", &trajectories)?),
        None => None,
    };

    debug!(
        "Derived geometry for {} locations in {}",
        location.height(),
        crs.horizontal
    );

    Ok(GeospatialDatabase {
        crs,
        project: db.project.clone(),
        location: GeoFrame::new(location.clone(), location_geometry),
        lon_lat_height: GeoFrame::new(lon_lat_height, lon_lat_geometry),
        in_situ,
        sample,
        lab_tests,
        other: db.other.clone(),
    })
}

/// Float values of the first raw column ending in `suffix` (HOLE_ORNT, LOCA_INCL)
fn heading_values(location: &DataFrame, suffix: &str) -> Result<Vec<Option<f64>>> {
    let column = ["HOLE", "LOCA"]
        .iter()
        .map(|prefix| format!("{}{}", prefix, suffix))
        .find(|name| has_column(location, name));
    optional_float_values(location, "Location", column.as_deref())
}

fn locate_rows(
    table: &DataFrame,
    name: &str,
    trajectories: &HashMap<String, Trajectory>,
) -> Result<GeoFrame> {
    let uids = string_values(table, name, columns::LOCATION_UID)?;
    let top = optional_float_values(table, name, Some(columns::DEPTH_TO_TOP))?;
    let base = optional_float_values(table, name, Some(columns::DEPTH_TO_BASE))?;

    let geometry = uids
        .iter()
        .enumerate()
        .map(|(row, uid)| {
            let trajectory = trajectories.get(uid.as_ref()?)?;
            trajectory.geometry_between(top[row], base[row])
        })
        .collect();

    Ok(GeoFrame::new(table.clone(), geometry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn database() -> StandardizedDatabase {
        let project = DataFrame::new(vec![
            string_column(columns::PROJECT_UID, strings(&["P1"])),
            string_column(columns::HORIZONTAL_CRS, strings(&["EPSG:2326"])),
            string_column(columns::VERTICAL_CRS, strings(&["EPSG:5738"])),
        ])
        .unwrap();

        let location = DataFrame::new(vec![
            string_column(columns::LOCATION_UID, strings(&["BH1_P1", "BH2_P1"])),
            string_column(columns::PROJECT_UID, strings(&["P1", "P1"])),
            float_column(columns::EASTING, vec![Some(836694.05), Some(837000.0)]),
            float_column(columns::NORTHING, vec![Some(819069.80), Some(820000.0)]),
            float_column(columns::GROUND_LEVEL_ELEVATION, vec![Some(5.0), Some(4.0)]),
            float_column(columns::DEPTH_TO_BASE, vec![Some(20.0), None]),
            float_column("HOLE_ORNT", vec![None, Some(90.0)]),
            float_column("HOLE_INCL", vec![None, Some(60.0)]),
        ])
        .unwrap();

        let geol = DataFrame::new(vec![
            string_column(columns::LOCATION_UID, strings(&["BH1_P1", "BH1_P1", "BH9_P1"])),
            float_column(columns::DEPTH_TO_TOP, vec![Some(0.0), Some(3.0), Some(0.0)]),
            float_column(columns::DEPTH_TO_BASE, vec![Some(3.0), None, Some(1.0)]),
        ])
        .unwrap();

        StandardizedDatabase {
            project,
            location,
            in_situ: BTreeMap::from([("GEOL".to_string(), geol)]),
            sample: None,
            lab_tests: BTreeMap::new(),
            other: BTreeMap::new(),
        }
    }

    fn coord(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn test_location_geometry() {
        let geodb = create_geodatabase(&database()).unwrap();

        assert_eq!(
            geodb.location.geometry[0],
            Some(Geometry::line([
                (coord(836694.05, 819069.80), 5.0),
                (coord(836694.05, 819069.80), -15.0),
            ]))
        );
        assert_eq!(
            geodb.location.geometry[1],
            Some(Geometry::point(coord(837000.0, 820000.0), 4.0))
        );
    }

    #[test]
    fn test_lon_lat_height_is_one_to_one() {
        let geodb = create_geodatabase(&database()).unwrap();
        let llh = &geodb.lon_lat_height;

        assert_eq!(
            string_values(&llh.frame, "LonLatHeight", columns::LOCATION_UID).unwrap(),
            string_values(&geodb.location.frame, "Location", columns::LOCATION_UID).unwrap()
        );
        assert_eq!(llh.geometry.len(), geodb.location.height());

        let lon = float_values(&llh.frame, "LonLatHeight", columns::LONGITUDE).unwrap();
        let lat = float_values(&llh.frame, "LonLatHeight", columns::LATITUDE).unwrap();
        let h = float_values(&llh.frame, "LonLatHeight", columns::EGM2008_GROUND_LEVEL_HEIGHT)
            .unwrap();

        // HK80 grid origin, shifted to WGS84 by about 8.8" east and 5.5" south
        assert!((lon[0].unwrap() - (114.178556 + 8.8 / 3600.0)).abs() < 5e-4);
        assert!((lat[0].unwrap() - (22.312133 - 5.5 / 3600.0)).abs() < 5e-4);
        assert!((h[0].unwrap() - 3.77).abs() < 1e-9);
        assert!(matches!(llh.geometry[0], Some(Geometry::Point { .. })));
    }

    #[test]
    fn test_inclined_trajectory() {
        let trajectory = Trajectory {
            collar: coord(0.0, 0.0),
            collar_elevation: 10.0,
            azimuth: 90.0,
            inclination: 60.0,
        };
        let (p, z) = trajectory.point_at(10.0);
        assert!((p.x - 5.0).abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
        assert!((z - (10.0 - 10.0 * 60f64.to_radians().sin())).abs() < 1e-9);
    }

    #[test]
    fn test_in_situ_rows_follow_borehole() {
        let geodb = create_geodatabase(&database()).unwrap();
        let geol = &geodb.in_situ["GEOL"];

        assert_eq!(
            geol.geometry[0],
            Some(Geometry::line([
                (coord(836694.05, 819069.80), 5.0),
                (coord(836694.05, 819069.80), 2.0),
            ]))
        );
        assert_eq!(
            geol.geometry[1],
            Some(Geometry::point(coord(836694.05, 819069.80), 2.0))
        );
        assert_eq!(geol.geometry[2], None);
    }

    #[test]
    fn test_geojson_geometry() {
        let point = Geometry::point(coord(114.1, 22.3), 4.5);
        assert_eq!(
            point.to_geojson().value,
            geojson::Value::Point(vec![114.1, 22.3, 4.5])
        );

        let line = Geometry::line([(coord(1.0, 2.0), 3.0), (coord(1.0, 2.0), -7.0)]);
        assert_eq!(
            serde_json::to_value(line.to_geojson()).unwrap(),
            serde_json::json!({
                "type": "LineString",
                "coordinates": [[1.0, 2.0, 3.0], [1.0, 2.0, -7.0]],
            })
        );
    }
}
