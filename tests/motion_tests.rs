use approx::assert_abs_diff_eq;
use tokyo_motion::{
    config::TrainConfig,
    geometry::{Route, Vertex},
    motion::{DurationWindow, MotionProfile},
    prelude::*,
};

#[test]
fn profile_is_clamped_to_the_window() {
    let params = TrainConfig::default().motion();
    let window = DurationWindow::new(Duration::from_millis(5_000.0), Duration::from_millis(5_000.0));
    let profile = MotionProfile::solve(1_000.0, &params, Some(window));

    assert_abs_diff_eq!(profile.duration().as_millis(), 5_000.0, epsilon = 1e-9);
    assert_eq!(profile.position(Duration::ZERO), 0.0);
    assert_abs_diff_eq!(profile.position(Duration::from_millis(5_000.0)), 1.0, epsilon = 1e-9);

    let mut last = 0.0;
    for step in 0..=100 {
        let position = profile.position(Duration::from_millis(step as f64 * 50.0));
        assert!(position >= last);
        last = position;
    }
}

#[test]
fn profile_fills_a_long_window() {
    let params = TrainConfig::default().motion();
    let natural = MotionProfile::solve(5_000.0, &params, None);
    let window = DurationWindow::new(
        natural.duration() + Duration::from_seconds(30.0),
        natural.duration() + Duration::from_seconds(60.0),
    );
    let slowed = MotionProfile::solve(5_000.0, &params, Some(window));

    assert_abs_diff_eq!(
        slowed.duration().as_millis(),
        window.min.as_millis(),
        epsilon = 1e-6
    );
    assert!(slowed.top_speed() < natural.top_speed());
}

#[test]
fn distance_table_is_monotone() {
    let vertices: Vec<Coordinate> = (0..50)
        .map(|i| Coordinate::new(35.6 + i as f64 * 0.001, 139.7 + (i % 3) as f64 * 0.0005))
        .collect();
    let vertices: Vec<Vertex> = vertices.into_iter().map(Vertex::from).collect();
    let route = Route::new("Test.Curve", &vertices).unwrap();

    let table = route.table();
    assert_eq!(table.first().map(|sample| sample.distance), Some(0.0));
    assert!(table.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    assert_abs_diff_eq!(
        table.last().map(|sample| sample.distance).unwrap_or_default(),
        route.length().as_meters(),
        epsilon = 1e-6
    );
}
