//! Coordinate reference systems used by ground investigation data.
//!
//! Provides the transformations needed to place boreholes on a web map:
//! projected grid coordinates → WGS84 longitude/latitude, and heights on a
//! local vertical datum → EGM2008 heights.
//!
//! # Supported systems
//!
//! | EPSG | Kind | Name |
//! |------|------|------|
//! | 4326 | horizontal | WGS 84 (geographic) |
//! | 2326 | horizontal | Hong Kong 1980 Grid System |
//! | 27700 | horizontal | OSGB36 / British National Grid |
//! | 32601-32660, 32701-32760 | horizontal | WGS 84 / UTM |
//! | 3855 | vertical | EGM2008 height |
//! | 5773 | vertical | EGM96 height |
//! | 5701 | vertical | Ordnance Datum Newlyn |
//! | 5738 | vertical | Hong Kong Principal Datum |
//!
//! Projected systems are inverted with the Snyder transverse Mercator series
//! on the source ellipsoid, then moved to WGS84 with a 7-parameter Helmert
//! transformation (position vector convention) through geocentric
//! coordinates. Vertical datums use a constant offset.

use crate::error::{AgsError, Result};
use regex::Regex;
use std::f64::consts::PI;
use std::fmt;
use std::sync::OnceLock;

const ARC_SECONDS_TO_RADIANS: f64 = PI / (180.0 * 3600.0);

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// International 1924 (Hayford), used by Hong Kong 1980
    pub const INTERNATIONAL_1924: Ellipsoid = Ellipsoid {
        a: 6_378_388.0,
        f: 1.0 / 297.0,
    };

    /// Airy 1830, used by OSGB36
    pub const AIRY_1830: Ellipsoid = Ellipsoid {
        a: 6_377_563.396,
        f: 1.0 / 299.324_964_6,
    };

    /// First eccentricity squared
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }

    /// Geodetic (degrees, meters) to geocentric cartesian (meters)
    pub fn to_geocentric(&self, lat: f64, lon: f64, h: f64) -> (f64, f64, f64) {
        let lat = lat.to_radians();
        let lon = lon.to_radians();
        let e2 = self.e2();
        let n = self.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();

        (
            (n + h) * lat.cos() * lon.cos(),
            (n + h) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + h) * lat.sin(),
        )
    }

    /// Geocentric cartesian to geodetic (degrees, degrees, meters)
    pub fn to_geodetic(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let e2 = self.e2();
        let p = (x * x + y * y).sqrt();
        let lon = y.atan2(x);

        let mut lat = z.atan2(p * (1.0 - e2));
        let mut h = 0.0;
        for _ in 0..10 {
            let n = self.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
            h = p / lat.cos() - n;
            let next = z.atan2(p * (1.0 - e2 * n / (n + h)));
            if (next - lat).abs() < 1e-14 {
                lat = next;
                break;
            }
            lat = next;
        }

        (lat.to_degrees(), lon.to_degrees(), h)
    }
}

/// Transverse Mercator projection on an arbitrary ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Latitude of natural origin in degrees
    pub lat0: f64,
    /// Central meridian in degrees
    pub lon0: f64,
    /// Scale factor at the central meridian
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl TransverseMercator {
    /// UTM zone on WGS84
    pub fn utm(zone: u8, northern: bool) -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            lat0: 0.0,
            lon0: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
            k0: 0.9996,
            false_easting: 500_000.0,
            false_northing: if northern { 0.0 } else { 10_000_000.0 },
        }
    }

    /// Meridian arc length from the equator to `lat` (radians)
    fn meridian_arc(&self, lat: f64) -> f64 {
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.ellipsoid.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }

    /// Geographic (lat, lon) in degrees to grid (easting, northing)
    pub fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let lam = lon.to_radians();
        let lam0 = self.lon0.to_radians();

        let n = a / (1.0 - e2 * phi.sin().powi(2)).sqrt();
        let t = phi.tan().powi(2);
        let c = ep2 * phi.cos().powi(2);
        let big_a = (lam - lam0) * phi.cos();
        let m = self.meridian_arc(phi);
        let m0 = self.meridian_arc(self.lat0.to_radians());

        let easting = self.false_easting
            + self.k0
                * n
                * (big_a
                    + (1.0 - t + c) * big_a.powi(3) / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * big_a.powi(5) / 120.0);

        let northing = self.false_northing
            + self.k0
                * (m - m0
                    + n * phi.tan()
                        * (big_a.powi(2) / 2.0
                            + (5.0 - t + 9.0 * c + 4.0 * c * c) * big_a.powi(4) / 24.0
                            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2)
                                * big_a.powi(6)
                                / 720.0));

        (easting, northing)
    }

    /// Grid (easting, northing) to geographic (lat, lon) in degrees
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = e2 / (1.0 - e2);
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let m0 = self.meridian_arc(self.lat0.to_radians());
        let m = m0 + (northing - self.false_northing) / self.k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let n1 = a / (1.0 - e2 * sin1 * sin1).sqrt();
        let t1 = phi1.tan().powi(2);
        let c1 = ep2 * phi1.cos().powi(2);
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = (easting - self.false_easting) / (n1 * self.k0);

        let lat = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lon = self.lon0.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / phi1.cos();

        (lat.to_degrees(), lon.to_degrees())
    }
}

/// 7-parameter Helmert transformation to WGS84, position vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helmert {
    /// Translations in meters
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    /// Rotations in arc seconds
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    /// Scale in parts per million
    pub ds_ppm: f64,
}

impl Helmert {
    pub fn apply(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let s = 1.0 + self.ds_ppm * 1e-6;
        let rx = self.rx * ARC_SECONDS_TO_RADIANS;
        let ry = self.ry * ARC_SECONDS_TO_RADIANS;
        let rz = self.rz * ARC_SECONDS_TO_RADIANS;

        (
            self.tx + s * (x - rz * y + ry * z),
            self.ty + s * (rz * x + y - rx * z),
            self.tz + s * (-ry * x + rx * y + z),
        )
    }
}

/// Projected system with its datum shift to WGS84
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedCrs {
    pub code: u32,
    pub name: &'static str,
    pub projection: TransverseMercator,
    /// None when the datum is already WGS84
    pub to_wgs84: Option<Helmert>,
}

/// Horizontal coordinate reference system
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HorizontalCrs {
    /// WGS84 longitude/latitude; easting = longitude, northing = latitude
    Wgs84,
    Projected(ProjectedCrs),
}

impl HorizontalCrs {
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        let code = parse_epsg_code(identifier)?;
        Self::from_epsg(code).ok_or_else(|| AgsError::UnknownCrs {
            identifier: identifier.to_string(),
        })
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(HorizontalCrs::Wgs84),
            2326 => Some(HorizontalCrs::Projected(ProjectedCrs {
                code,
                name: "Hong Kong 1980 Grid System",
                projection: TransverseMercator {
                    ellipsoid: Ellipsoid::INTERNATIONAL_1924,
                    lat0: 22.0 + 18.0 / 60.0 + 43.68 / 3600.0,
                    lon0: 114.0 + 10.0 / 60.0 + 42.80 / 3600.0,
                    k0: 1.0,
                    false_easting: 836_694.05,
                    false_northing: 819_069.80,
                },
                to_wgs84: Some(Helmert {
                    tx: -162.619,
                    ty: -276.959,
                    tz: -161.764,
                    rx: 0.067753,
                    ry: -2.243648,
                    rz: -1.158828,
                    ds_ppm: -1.094246,
                }),
            })),
            27700 => Some(HorizontalCrs::Projected(ProjectedCrs {
                code,
                name: "OSGB36 / British National Grid",
                projection: TransverseMercator {
                    ellipsoid: Ellipsoid::AIRY_1830,
                    lat0: 49.0,
                    lon0: -2.0,
                    k0: 0.999_601_271_7,
                    false_easting: 400_000.0,
                    false_northing: -100_000.0,
                },
                to_wgs84: Some(Helmert {
                    tx: 446.448,
                    ty: -125.157,
                    tz: 542.060,
                    rx: 0.1502,
                    ry: 0.2470,
                    rz: 0.8421,
                    ds_ppm: -20.4894,
                }),
            })),
            32601..=32660 | 32701..=32760 => {
                let northern = code < 32700;
                let zone = (code % 100) as u8;
                Some(HorizontalCrs::Projected(ProjectedCrs {
                    code,
                    name: if northern {
                        "WGS 84 / UTM north"
                    } else {
                        "WGS 84 / UTM south"
                    },
                    projection: TransverseMercator::utm(zone, northern),
                    to_wgs84: None,
                }))
            }
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            HorizontalCrs::Wgs84 => 4326,
            HorizontalCrs::Projected(p) => p.code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HorizontalCrs::Wgs84 => "WGS 84",
            HorizontalCrs::Projected(p) => p.name,
        }
    }

    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.code())
    }

    /// Source coordinates to WGS84 (longitude, latitude) in degrees
    pub fn to_wgs84(&self, easting: f64, northing: f64) -> (f64, f64) {
        match self {
            HorizontalCrs::Wgs84 => (easting, northing),
            HorizontalCrs::Projected(p) => {
                let (lat, lon) = p.projection.inverse(easting, northing);
                match &p.to_wgs84 {
                    None => (lon, lat),
                    Some(helmert) => {
                        let (x, y, z) = p.projection.ellipsoid.to_geocentric(lat, lon, 0.0);
                        let (x, y, z) = helmert.apply(x, y, z);
                        let (lat, lon, _) = Ellipsoid::WGS84.to_geodetic(x, y, z);
                        (lon, lat)
                    }
                }
            }
        }
    }
}

impl fmt::Display for HorizontalCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identifier(), self.name())
    }
}

/// Vertical datum with its approximate offset to EGM2008 heights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalCrs {
    pub code: u32,
    pub name: &'static str,
    /// Added to a height on this datum to obtain an EGM2008 height
    pub offset_to_egm2008: f64,
}

impl VerticalCrs {
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        let code = parse_epsg_code(identifier)?;
        Self::from_epsg(code).ok_or_else(|| AgsError::UnknownCrs {
            identifier: identifier.to_string(),
        })
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        let (name, offset_to_egm2008) = match code {
            3855 => ("EGM2008 height", 0.0),
            5773 => ("EGM96 height", 0.0),
            5701 => ("ODN height", 0.0),
            // HKPD zero lies about 1.23 m below mean sea level
            5738 => ("HKPD height", -1.23),
            _ => return None,
        };
        Some(Self {
            code,
            name,
            offset_to_egm2008,
        })
    }

    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.code)
    }

    pub fn to_egm2008(&self, height: f64) -> f64 {
        height + self.offset_to_egm2008
    }
}

impl fmt::Display for VerticalCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identifier(), self.name)
    }
}

/// Horizontal and vertical system of one project
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrsPair {
    pub horizontal: HorizontalCrs,
    pub vertical: VerticalCrs,
}

impl CrsPair {
    pub fn from_identifiers(horizontal: &str, vertical: &str) -> Result<Self> {
        Ok(Self {
            horizontal: HorizontalCrs::from_identifier(horizontal)?,
            vertical: VerticalCrs::from_identifier(vertical)?,
        })
    }
}

fn epsg_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i)(?:EPSG:)?\s*(\d+)$").expect("EPSG pattern is valid")
    })
}

/// Parse `EPSG:<code>` (case-insensitive) or a bare code
pub fn parse_epsg_code(identifier: &str) -> Result<u32> {
    epsg_pattern()
        .captures(identifier.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|code| code.as_str().parse::<u32>().ok())
        .ok_or_else(|| AgsError::UnknownCrs {
            identifier: identifier.to_string(),
        })
}
