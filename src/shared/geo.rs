use std::{
    cmp,
    fmt::Display,
    ops::{Add, Div, Mul, Sub},
};

use serde::{Deserialize, Serialize};

pub(crate) const EARTH_RADIUS: Distance = Distance::from_kilometers(6371.0);
pub(crate) const LONGITUDE_DISTANCE: Distance = Distance::from_meters(111_320.0);
pub(crate) const LATITUDE_DISTANCE: Distance = Distance::from_meters(110_540.0);

#[derive(Debug, Clone, Copy, Default)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Distance {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Distance {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div for Distance {
    type Output = f64;
    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

impl Distance {
    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_kilometers(distance: f64) -> Self {
        Self(distance * 1000.0)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub const fn as_kilometers(&self) -> f64 {
        self.0 / 1000.0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.latitude, value.longitude)
    }
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Great circle distance between two coordinates.
    pub fn haversine_distance(&self, coord: &Self) -> Distance {
        let dist_lat = f64::to_radians(coord.latitude - self.latitude);
        let dist_lon = f64::to_radians(coord.longitude - self.longitude);
        let a = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(coord.latitude))
                * f64::sin(dist_lon / 2.0)
                * f64::sin(dist_lon / 2.0);
        let c = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));
        EARTH_RADIUS * c
    }

    /// Initial bearing towards `coord` in degrees, in the range (-180, 180].
    /// Zero points north, positive values turn clockwise.
    pub fn bearing(&self, coord: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = coord.latitude.to_radians();
        let dist_lon = (coord.longitude - self.longitude).to_radians();
        let y = dist_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dist_lon.cos();
        y.atan2(x).to_degrees()
    }

    /// Linear interpolation in degree space. Good enough at the segment
    /// lengths a route polyline carries.
    pub fn lerp(&self, coord: &Self, t: f64) -> Self {
        Self {
            latitude: self.latitude + (coord.latitude - self.latitude) * t,
            longitude: self.longitude + (coord.longitude - self.longitude) * t,
        }
    }

    /// Local planar position in meters relative to `origin`.
    pub(crate) fn to_plane(&self, origin: &Self) -> (f64, f64) {
        let x = (self.longitude - origin.longitude)
            * LONGITUDE_DISTANCE.as_meters()
            * origin.latitude.to_radians().cos();
        let y = (self.latitude - origin.latitude) * LATITUDE_DISTANCE.as_meters();
        (x, y)
    }
}

/// An axis aligned latitude/longitude box, used as the visible viewport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    pub fn new(south_west: Coordinate, north_east: Coordinate) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.latitude >= self.south_west.latitude
            && coordinate.latitude <= self.north_east.latitude
            && coordinate.longitude >= self.south_west.longitude
            && coordinate.longitude <= self.north_east.longitude
    }
}

/// Normalizes an angle in degrees to (-180, 180].
pub fn normalize_bearing(bearing: f64) -> f64 {
    let wrapped = bearing.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

#[test]
fn distance_test() {
    let tokyo = Coordinate::new(35.681_236, 139.767_125);
    let shinjuku = Coordinate::new(35.690_921, 139.700_258);
    let d = tokyo.haversine_distance(&shinjuku);
    assert!((d.as_kilometers() - 6.13).abs() < 0.1);
}

#[test]
fn distance_eq_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(1.0);
    assert_eq!(dist_a, dist_b)
}

#[test]
fn bearing_test() {
    let origin = Coordinate::new(35.0, 139.0);
    assert!(origin.bearing(&Coordinate::new(35.1, 139.0)).abs() < 1e-9);
    assert!((origin.bearing(&Coordinate::new(35.0, 139.1)) - 90.0).abs() < 0.1);
    assert!((origin.bearing(&Coordinate::new(34.9, 139.0)).abs() - 180.0).abs() < 1e-9);
}

#[test]
fn normalize_bearing_test() {
    assert_eq!(normalize_bearing(190.0), -170.0);
    assert_eq!(normalize_bearing(-190.0), 170.0);
    assert_eq!(normalize_bearing(180.0), 180.0);
}

#[test]
fn bounds_contains_test() {
    let bounds = Bounds::new(Coordinate::new(35.5, 139.5), Coordinate::new(35.9, 140.0));
    assert!(bounds.contains(&Coordinate::new(35.68, 139.76)));
    assert!(!bounds.contains(&Coordinate::new(34.0, 139.76)));
}
