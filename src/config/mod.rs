use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

/// Optional settings file. Anything not set falls back to defaults.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct Config {
    data_dir: Option<PathBuf>,
}

impl Config {
    pub(crate) fn empty() -> Config {
        Config::default()
    }

    pub(crate) fn load_from_file(file_path: &Path) -> Config {
        if !file_path.exists() || !file_path.is_file() {
            return Config::empty();
        }

        let parsed = fs::read_to_string(file_path)
            .ok()
            .and_then(|content| toml::from_str::<Config>(&content).ok());
        match parsed {
            Some(config) => config,
            None => {
                warn!("Unable to read config file {}; using defaults", file_path.display());
                Config::empty()
            }
        }
    }

    /// Resolve the data directory: config override, else the platform data
    /// dir, else the working directory.
    pub(crate) fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }

        match dirs::data_dir() {
            Some(dir) => dir.join("findash"),
            None => PathBuf::from("."),
        }
    }
}
