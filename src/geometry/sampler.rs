use serde::Serialize;

use crate::{
    geometry::{Route, Sample},
    shared::{Coordinate, normalize_bearing},
};

/// Resolved placement of a single car (or aircraft) along a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CarPose {
    pub coordinate: Coordinate,
    pub altitude: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl CarPose {
    pub fn is_finite(&self) -> bool {
        self.coordinate.is_finite()
            && self.altitude.is_finite()
            && self.bearing.is_finite()
            && self.pitch.is_finite()
    }

    /// The same placement seen by a vehicle travelling against the route direction.
    pub fn reversed(self) -> Self {
        Self {
            bearing: normalize_bearing(self.bearing + 180.0),
            pitch: -self.pitch,
            ..self
        }
    }
}

impl Route {
    /// Places `composition` cars of `car_unit` meters centered on `distance`.
    ///
    /// The segment containing the rearmost car is found by binary search, the
    /// remaining cars are resolved by walking forward. Distances are clamped to the
    /// route so cars hanging past either end stack on the end vertex.
    pub fn sample_at(&self, distance: f64, composition: u32, car_unit: f64) -> Vec<CarPose> {
        let table = self.table();
        let Some(last) = table.last() else {
            return Vec::new();
        };
        let length = last.distance;
        let first = distance - car_unit * (composition.saturating_sub(1)) as f64 / 2.0;

        let mut cars = Vec::with_capacity(composition as usize);
        let mut segment = locate(table, first.clamp(0.0, length));
        for car in 0..composition {
            let position = (first + car as f64 * car_unit).clamp(0.0, length);
            while segment + 2 < table.len() && table[segment + 1].distance < position {
                segment += 1;
            }
            cars.push(interpolate(&table[segment], &table[segment + 1], position));
        }
        cars
    }
}

/// Index of the segment `[i, i + 1]` containing `distance`.
fn locate(table: &[Sample], distance: f64) -> usize {
    let upper = table.partition_point(|sample| sample.distance <= distance);
    upper.saturating_sub(1).min(table.len().saturating_sub(2))
}

fn interpolate(from: &Sample, to: &Sample, distance: f64) -> CarPose {
    let span = to.distance - from.distance;
    let t = if span > 0.0 {
        ((distance - from.distance) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    if t >= 1.0 {
        return CarPose {
            coordinate: to.coordinate,
            altitude: to.altitude,
            bearing: from.bearing,
            pitch: from.pitch,
        };
    }
    CarPose {
        coordinate: from.coordinate.lerp(&to.coordinate, t),
        altitude: from.altitude + (to.altitude - from.altitude) * t,
        bearing: from.bearing,
        pitch: from.pitch,
    }
}

#[cfg(test)]
fn straight_route() -> Route {
    use crate::geometry::Vertex;
    let vertices: Vec<Vertex> = [
        (35.680, 139.760),
        (35.690, 139.760),
        (35.700, 139.760),
        (35.700, 139.780),
    ]
    .into_iter()
    .map(|point| Coordinate::from(point).into())
    .collect();
    Route::new("straight", &vertices).unwrap()
}

#[test]
fn sample_single_car_at_vertex() {
    let route = straight_route();
    let second = route.table()[1];
    let cars = route.sample_at(second.distance, 1, 20.0);
    assert_eq!(cars.len(), 1);
    assert!((cars[0].coordinate.latitude - 35.690).abs() < 1e-9);
}

#[test]
fn sample_cars_are_spread_along_route() {
    let route = straight_route();
    let cars = route.sample_at(500.0, 5, 20.0);
    assert_eq!(cars.len(), 5);
    assert!(
        cars.windows(2)
            .all(|pair| pair[0].coordinate.latitude < pair[1].coordinate.latitude)
    );
    let spread = cars[0]
        .coordinate
        .haversine_distance(&cars[4].coordinate)
        .as_meters();
    assert!((spread - 80.0).abs() < 0.5);
}

#[test]
fn sample_walks_across_segments() {
    let route = straight_route();
    let corner = route.table()[2].distance;
    let cars = route.sample_at(corner, 3, 40.0);
    assert!(cars[0].bearing.abs() < 1e-6);
    assert!((cars[2].bearing - 90.0).abs() < 0.1);
}

#[test]
fn sample_clamps_past_route_end() {
    let route = straight_route();
    let length = route.length().as_meters();
    let cars = route.sample_at(length + 100.0, 2, 20.0);
    let end = route.table()[3].coordinate;
    assert!(cars.iter().all(|car| car.coordinate == end));
}

#[test]
fn reversed_pose_turns_around() {
    let pose = CarPose {
        bearing: 10.0,
        pitch: 2.0,
        ..Default::default()
    };
    let reversed = pose.reversed();
    assert_eq!(reversed.bearing, -170.0);
    assert_eq!(reversed.pitch, -2.0);
}
