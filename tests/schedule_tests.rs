mod common;

use std::{fs, io::Write, path::PathBuf};

use common::line_schedule;
use tokyo_motion::{
    index::RuntimeIndex,
    prelude::*,
    schedule::{self, Error},
};
use zip::{ZipWriter, write::SimpleFileOptions};

fn tables(schedule: &Schedule) -> Vec<(&'static str, String)> {
    vec![
        ("railways.json", serde_json::to_string(&schedule.railways).unwrap()),
        ("stations.json", serde_json::to_string(&schedule.stations).unwrap()),
        ("timetables.json", serde_json::to_string(&schedule.timetables).unwrap()),
        ("train_types.json", serde_json::to_string(&schedule.train_types).unwrap()),
        ("flight_routes.json", serde_json::to_string(&schedule.flight_routes).unwrap()),
    ]
}

fn scratch(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tokyo-motion-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&path);
    fs::create_dir_all(&path).unwrap();
    path
}

#[test]
fn reads_a_directory_bundle() {
    let directory = scratch("directory");
    for (name, json) in tables(&line_schedule()) {
        fs::write(directory.join(name), json).unwrap();
    }

    let schedule = ScheduleReader::new(schedule::Config::default())
        .from_path(&directory)
        .read()
        .unwrap();
    assert_eq!(schedule.railways.len(), 1);
    assert_eq!(schedule.timetables.len(), 4);
    assert!(schedule.holidays.is_empty());

    let index = RuntimeIndex::new().load_schedule(&schedule).unwrap();
    assert_eq!(index.railway("Test.Line").unwrap().stations.len(), 3);
    assert!(index.flight_route("HND.34R.Departure").is_some());
    fs::remove_dir_all(directory).unwrap();
}

#[test]
fn reads_a_zip_bundle() {
    let directory = scratch("zip");
    let path = directory.join("bundle.zip");
    let mut writer = ZipWriter::new(fs::File::create(&path).unwrap());
    for (name, json) in tables(&line_schedule()) {
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(json.as_bytes()).unwrap();
    }
    writer.finish().unwrap();

    let schedule = ScheduleReader::new(schedule::Config::default())
        .from_path(&path)
        .read()
        .unwrap();
    assert_eq!(schedule.stations.len(), 3);
    assert_eq!(schedule.train_types.len(), 1);
    fs::remove_dir_all(directory).unwrap();
}

#[test]
fn missing_required_table_fails() {
    let directory = scratch("missing");
    fs::write(directory.join("railways.json"), "[]").unwrap();

    let result = ScheduleReader::new(schedule::Config::default())
        .from_directory(&directory)
        .read();
    assert!(matches!(result, Err(Error::FileNotFound(name)) if name == "stations.json"));
    fs::remove_dir_all(directory).unwrap();
}

#[test]
fn malformed_table_names_the_file() {
    let directory = scratch("malformed");
    fs::write(directory.join("railways.json"), "[]").unwrap();
    fs::write(directory.join("stations.json"), "{").unwrap();
    fs::write(directory.join("timetables.json"), "[]").unwrap();

    let result = ScheduleReader::new(schedule::Config::default())
        .from_directory(&directory)
        .read();
    assert!(matches!(result, Err(Error::Json { file, .. }) if file == "stations.json"));
    fs::remove_dir_all(directory).unwrap();
}

#[test]
fn reader_without_storage_fails() {
    let result = ScheduleReader::default().read();
    assert!(matches!(result, Err(Error::NoStorage)));
}
