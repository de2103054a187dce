//! Reader for static schedule bundles: a zip archive or a directory of JSON tables.

use serde::de::DeserializeOwned;
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    time::Instant,
};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

mod config;
pub mod models;
pub use config::*;
pub use models::*;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Json error in {file}: {source}")]
    Json {
        file: String,
        source: serde_json::Error,
    },
    #[error("Could not find file with name: {0}")]
    FileNotFound(String),
    #[error("No storage configured")]
    NoStorage,
}

#[derive(Debug, Default)]
pub enum StorageType {
    #[default]
    None,
    Zip(PathBuf),
    Directory(PathBuf),
}

#[derive(Default)]
pub struct ScheduleReader {
    config: Config,
    storage: StorageType,
}

impl ScheduleReader {
    pub fn new(config: self::Config) -> Self {
        Self {
            config,
            storage: Default::default(),
        }
    }

    pub fn from_zip<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.storage = StorageType::Zip(path.as_ref().to_path_buf());
        self
    }

    pub fn from_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.storage = StorageType::Directory(path.as_ref().to_path_buf());
        self
    }

    /// Picks zip or directory storage from what `path` points at.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Self {
        if path.as_ref().is_dir() {
            self.from_directory(path)
        } else {
            self.from_zip(path)
        }
    }

    pub fn read(&self) -> Result<Schedule, self::Error> {
        debug!("Reading schedule from {:?}...", self.storage);
        let now = Instant::now();
        let schedule = Schedule {
            railways: self.read_table(&self.config.railways_file_name, true)?,
            stations: self.read_table(&self.config.stations_file_name, true)?,
            timetables: self.read_table(&self.config.timetables_file_name, true)?,
            train_types: self.read_table(&self.config.train_types_file_name, false)?,
            flight_routes: self.read_table(&self.config.flight_routes_file_name, false)?,
            holidays: self.read_table(&self.config.holidays_file_name, false)?,
        };
        debug!("Reading schedule took {:?}", now.elapsed());
        Ok(schedule)
    }

    fn read_table<T: DeserializeOwned>(
        &self,
        file_name: &str,
        required: bool,
    ) -> Result<Vec<T>, self::Error> {
        let result = match &self.storage {
            StorageType::None => return Err(self::Error::NoStorage),
            StorageType::Zip(path) => read_from_zip(path, file_name),
            StorageType::Directory(path) => read_from_directory(path, file_name),
        };
        match result {
            Err(self::Error::FileNotFound(_)) if !required => Ok(Vec::new()),
            result => result,
        }
    }
}

fn read_from_zip<T: DeserializeOwned>(zip_path: &Path, file_name: &str) -> Result<Vec<T>, self::Error> {
    let zip_file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(zip_file)?;
    let index = archive
        .index_for_name(file_name)
        .ok_or(self::Error::FileNotFound(file_name.to_string()))?;
    let file = archive.by_index(index)?;
    parse_json(BufReader::new(file), file_name)
}

fn read_from_directory<T: DeserializeOwned>(
    directory: &Path,
    file_name: &str,
) -> Result<Vec<T>, self::Error> {
    let path = directory.join(file_name);
    if !path.is_file() {
        return Err(self::Error::FileNotFound(file_name.to_string()));
    }
    let file = File::open(path)?;
    parse_json(BufReader::new(file), file_name)
}

fn parse_json<R: io::Read, T: DeserializeOwned>(reader: R, file_name: &str) -> Result<Vec<T>, self::Error> {
    serde_json::from_reader(reader).map_err(|source| self::Error::Json {
        file: file_name.to_string(),
        source,
    })
}
