use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{KernelError, Result};

/// Coordinate reference system of a spatial point.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Crs {
    /// Two-dimensional cartesian plane.
    Cartesian,
    /// Three-dimensional cartesian space.
    Cartesian3D,
    /// WGS-84 longitude/latitude.
    Wgs84,
    /// WGS-84 longitude/latitude/height.
    Wgs84_3D,
}

impl Crs {
    /// EPSG/SR-ORG code identifying the system.
    pub fn code(self) -> i32 {
        match self {
            Crs::Cartesian => 7203,
            Crs::Cartesian3D => 9157,
            Crs::Wgs84 => 4326,
            Crs::Wgs84_3D => 4979,
        }
    }

    /// Looks a system up by its code.
    pub fn from_code(code: i32) -> Option<Crs> {
        match code {
            7203 => Some(Crs::Cartesian),
            9157 => Some(Crs::Cartesian3D),
            4326 => Some(Crs::Wgs84),
            4979 => Some(Crs::Wgs84_3D),
            _ => None,
        }
    }

    /// Number of coordinates a point in this system carries.
    pub fn dimension(self) -> usize {
        match self {
            Crs::Cartesian | Crs::Wgs84 => 2,
            Crs::Cartesian3D | Crs::Wgs84_3D => 3,
        }
    }

    /// Canonical lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Crs::Cartesian => "cartesian",
            Crs::Cartesian3D => "cartesian-3d",
            Crs::Wgs84 => "wgs-84",
            Crs::Wgs84_3D => "wgs-84-3d",
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spatial point: a CRS plus one coordinate per dimension.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct Point {
    crs: Crs,
    coords: SmallVec<[f64; 3]>,
}

#[derive(Deserialize)]
struct RawPoint {
    crs: Crs,
    coords: SmallVec<[f64; 3]>,
}

impl TryFrom<RawPoint> for Point {
    type Error = KernelError;

    fn try_from(raw: RawPoint) -> Result<Self> {
        Point::new(raw.crs, &raw.coords)
    }
}

impl Point {
    /// Builds a point, rejecting coordinate lists that do not match the CRS.
    pub fn new(crs: Crs, coords: &[f64]) -> Result<Self> {
        if coords.len() != crs.dimension() {
            return Err(KernelError::InvalidArgument(format!(
                "{crs} points take {} coordinates, got {}",
                crs.dimension(),
                coords.len()
            )));
        }
        Ok(Self {
            crs,
            coords: SmallVec::from_slice(coords),
        })
    }

    /// Two-dimensional cartesian point.
    pub fn cartesian(x: f64, y: f64) -> Self {
        Self {
            crs: Crs::Cartesian,
            coords: SmallVec::from_slice(&[x, y]),
        }
    }

    /// Three-dimensional cartesian point.
    pub fn cartesian_3d(x: f64, y: f64, z: f64) -> Self {
        Self {
            crs: Crs::Cartesian3D,
            coords: SmallVec::from_slice(&[x, y, z]),
        }
    }

    /// Geographic point from longitude and latitude.
    pub fn wgs84(longitude: f64, latitude: f64) -> Self {
        Self {
            crs: Crs::Wgs84,
            coords: SmallVec::from_slice(&[longitude, latitude]),
        }
    }

    /// Geographic point from longitude, latitude and height.
    pub fn wgs84_3d(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            crs: Crs::Wgs84_3D,
            coords: SmallVec::from_slice(&[longitude, latitude, height]),
        }
    }

    /// Coordinate reference system.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Coordinates in CRS axis order.
    pub fn coordinates(&self) -> &[f64] {
        &self.coords
    }

    /// Orders by CRS code, then coordinate by coordinate.
    pub fn compare(&self, other: &Point) -> Ordering {
        self.crs
            .code()
            .cmp(&other.crs.code())
            .then_with(|| {
                for (a, b) in self.coords.iter().zip(other.coords.iter()) {
                    let ord = a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                self.coords.len().cmp(&other.coords.len())
            })
    }

    /// Same CRS and numerically equal coordinates.
    pub fn equals(&self, other: &Point) -> bool {
        self.crs == other.crs && self.coords == other.coords
    }

    /// Bounding-box test: every coordinate lies between the matching
    /// coordinates of the bounds. Points of another CRS never match.
    pub fn within_range(
        &self,
        lower: Option<&Point>,
        lower_inclusive: bool,
        upper: Option<&Point>,
        upper_inclusive: bool,
    ) -> bool {
        if let Some(lower) = lower {
            if lower.crs != self.crs
                || !Self::bound_holds(&self.coords, &lower.coords, lower_inclusive, Ordering::Less)
            {
                return false;
            }
        }
        if let Some(upper) = upper {
            let holds = Self::bound_holds(
                &self.coords,
                &upper.coords,
                upper_inclusive,
                Ordering::Greater,
            );
            if upper.crs != self.crs || !holds {
                return false;
            }
        }
        true
    }

    fn bound_holds(coords: &[f64], bound: &[f64], inclusive: bool, outside: Ordering) -> bool {
        coords.iter().zip(bound.iter()).all(|(c, b)| match c.partial_cmp(b) {
            Some(Ordering::Equal) => inclusive,
            Some(ord) => ord != outside,
            None => false,
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point({}", self.crs)?;
        for c in &self.coords {
            write!(f, ", {c}")?;
        }
        f.write_str(")")
    }
}
