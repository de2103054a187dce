use criterion::{Criterion, criterion_group, criterion_main};
use std::{env, hint::black_box, time::Duration};
use tokyo_motion::{
    config::{Config, TrainConfig},
    engine::Engine,
    geometry::{Route, Vertex},
    motion::{DurationWindow, MotionParams, MotionProfile},
    schedule::{self, ScheduleReader},
    shared::{Coordinate, Duration as SimDuration},
};

fn solve_windowed(params: &MotionParams) {
    let window = DurationWindow::new(
        SimDuration::from_minutes(2.0),
        SimDuration::from_minutes(3.0),
    );
    let profile = MotionProfile::solve(black_box(2_400.0), params, Some(window));
    for step in 0..120 {
        let _ = black_box(profile.position(SimDuration::from_seconds(step as f64)));
    }
}

fn sample_train(route: &Route) {
    let length = route.length().as_meters();
    for step in 0..100 {
        let distance = length * step as f64 / 100.0;
        let _ = black_box(route.sample_at(distance, 10, 20.0));
    }
}

fn winding_route() -> Route {
    let vertices: Vec<Vertex> = (0..2_000)
        .map(|i| {
            let t = i as f64 / 2_000.0;
            Coordinate::new(35.6 + t * 0.1, 139.7 + (t * 40.0).sin() * 0.01).into()
        })
        .collect();
    match Route::new("Bench.Winding", &vertices) {
        Ok(route) => route,
        Err(err) => panic!("Failed to build route: {err}"),
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let params = TrainConfig::default().motion();
    let route = winding_route();

    let mut group = c.benchmark_group("Motion");
    group.bench_function("Windowed profile solve", |b| b.iter(|| solve_windowed(&params)));
    group.bench_function("Ten car sampling", |b| b.iter(|| sample_train(&route)));
    group.finish();

    let schedule_path = match env::var("SCHEDULE_PATH") {
        Ok(path) => path,
        Err(err) => {
            println!("Missing SCHEDULE_PATH environment variable: {err}");
            return;
        }
    };
    let schedule = ScheduleReader::new(schedule::Config::default())
        .from_path(schedule_path)
        .read()
        .expect("Failed to read schedule");
    let mut engine =
        Engine::with_system_clock(schedule, Config::default()).expect("Failed to build engine");

    let mut group = c.benchmark_group("Engine");
    group.warm_up_time(Duration::from_secs(5));
    group.measurement_time(Duration::from_secs(20));
    group.bench_function("Frame tick", |b| b.iter(|| engine.tick()));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
