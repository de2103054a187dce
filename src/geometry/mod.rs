//! Route geometry: cumulative distance tables and offset sampling.

mod projection;
mod sampler;

pub use projection::*;
pub use sampler::*;

use crate::shared::{Coordinate, Distance};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Route {0} needs at least two distinct points")]
    TooFewPoints(String),
    #[error("Route {0} has non finite coordinates")]
    NonFinite(String),
    #[error("Station offsets of route {0} are not strictly increasing")]
    UnorderedStations(String),
    #[error("Route {route} has {offsets} station offsets for {stations} stations")]
    StationCountMismatch {
        route: String,
        offsets: usize,
        stations: usize,
    },
}

/// A polyline vertex with its precomputed distance and segment attitude.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub coordinate: Coordinate,
    /// Height above sea level in meters.
    pub altitude: f64,
    /// Cumulative distance from the first vertex in meters.
    pub distance: f64,
    /// Bearing of the segment starting at this vertex, in degrees.
    pub bearing: f64,
    /// Climb of that segment in meters per kilometer.
    pub slope: f64,
    /// `atan(slope / 1000)` in degrees.
    pub pitch: f64,
}

/// Point of a raw polyline before the distance table is built.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub coordinate: Coordinate,
    pub altitude: f64,
}

impl From<Coordinate> for Vertex {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            altitude: 0.0,
        }
    }
}

/// Geometry of a railway or flight path with stations resolved to offsets.
#[derive(Debug, Clone, Default)]
pub struct Route {
    table: Box<[Sample]>,
    station_offsets: Box<[f64]>,
}

impl Route {
    pub fn new(id: &str, vertices: &[Vertex]) -> Result<Self, self::Error> {
        Ok(Self {
            table: build_distance_table(id, vertices)?,
            station_offsets: Box::default(),
        })
    }

    /// Attaches precomputed station offsets, validating their order.
    pub fn with_station_offsets(mut self, id: &str, offsets: Vec<f64>) -> Result<Self, self::Error> {
        let ordered = offsets.windows(2).all(|pair| pair[0] < pair[1]);
        if !ordered || offsets.iter().any(|offset| !offset.is_finite()) {
            return Err(self::Error::UnorderedStations(id.to_string()));
        }
        self.station_offsets = offsets.into();
        Ok(self)
    }

    pub fn table(&self) -> &[Sample] {
        &self.table
    }

    pub fn station_offsets(&self) -> &[f64] {
        &self.station_offsets
    }

    pub fn station_offset(&self, station_index: usize) -> Option<f64> {
        self.station_offsets.get(station_index).copied()
    }

    pub fn length(&self) -> Distance {
        Distance::from_meters(self.table.last().map(|s| s.distance).unwrap_or_default())
    }
}

/// Builds the cumulative distance table in one pass.
///
/// Consecutive duplicate vertices are dropped so distances are strictly increasing.
/// The last sample repeats the attitude of the final segment.
pub fn build_distance_table(id: &str, vertices: &[Vertex]) -> Result<Box<[Sample]>, self::Error> {
    if vertices
        .iter()
        .any(|v| !v.coordinate.is_finite() || !v.altitude.is_finite())
    {
        return Err(self::Error::NonFinite(id.to_string()));
    }

    let mut table: Vec<Sample> = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        let Some(last) = table.last_mut() else {
            table.push(Sample {
                coordinate: vertex.coordinate,
                altitude: vertex.altitude,
                ..Default::default()
            });
            continue;
        };

        let length = last.coordinate.haversine_distance(&vertex.coordinate);
        if length.as_meters() <= f64::EPSILON {
            continue;
        }
        let slope = (vertex.altitude - last.altitude) / length.as_kilometers();
        last.bearing = last.coordinate.bearing(&vertex.coordinate);
        last.slope = slope;
        last.pitch = (slope / 1000.0).atan().to_degrees();
        let distance = last.distance + length.as_meters();
        let (bearing, pitch) = (last.bearing, last.pitch);
        table.push(Sample {
            coordinate: vertex.coordinate,
            altitude: vertex.altitude,
            distance,
            bearing,
            slope,
            pitch,
        });
    }

    if table.len() < 2 {
        return Err(self::Error::TooFewPoints(id.to_string()));
    }
    Ok(table.into())
}

#[cfg(test)]
fn line(points: &[(f64, f64, f64)]) -> Vec<Vertex> {
    points
        .iter()
        .map(|&(latitude, longitude, altitude)| Vertex {
            coordinate: Coordinate::new(latitude, longitude),
            altitude,
        })
        .collect()
}

#[test]
fn distance_table_is_strictly_increasing() {
    let vertices = line(&[
        (35.68, 139.76, 0.0),
        (35.68, 139.76, 0.0),
        (35.69, 139.77, 10.0),
        (35.70, 139.77, 10.0),
        (35.70, 139.77, 10.0),
        (35.71, 139.78, 0.0),
    ]);
    let table = build_distance_table("test", &vertices).unwrap();
    assert_eq!(table.len(), 4);
    assert!(table.windows(2).all(|pair| pair[0].distance < pair[1].distance));
    assert_eq!(table[0].distance, 0.0);
}

#[test]
fn pitch_follows_slope() {
    let vertices = line(&[(35.0, 139.0, 0.0), (35.01, 139.0, 20.0)]);
    let table = build_distance_table("test", &vertices).unwrap();
    let expected = (table[0].slope / 1000.0).atan().to_degrees();
    assert!(table[0].slope > 0.0);
    assert_eq!(table[0].pitch, expected);
    assert_eq!(table[1].pitch, expected);
}

#[test]
fn degenerate_route_is_rejected() {
    let vertices = line(&[(35.0, 139.0, 0.0), (35.0, 139.0, 0.0)]);
    assert_eq!(
        build_distance_table("dup", &vertices),
        Err(Error::TooFewPoints("dup".into()))
    );
}

#[test]
fn unordered_offsets_are_rejected() {
    let vertices = line(&[(35.0, 139.0, 0.0), (35.01, 139.0, 0.0)]);
    let route = Route::new("r", &vertices).unwrap();
    assert!(route.with_station_offsets("r", vec![0.0, 500.0, 400.0]).is_err());
}
