//! Code for loading program settings.
use crate::log::DEFAULT_LOG_LEVEL;
use crate::optimisation::DEFAULT_MIP_GAP;
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The settings file, read from the working directory if present
const SETTINGS_FILE_NAME: &str = "mesplan_settings.toml";

/// Program settings from the optional settings file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The default program log level
    pub log_level: String,
    /// Whether to overwrite output files by default
    pub overwrite: bool,
    /// Results root path for output folders. Defaults to `results`.
    pub results_root: PathBuf,
    /// Relative optimality gap passed to the solver
    pub mip_gap: Dimensionless,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
            results_root: PathBuf::from("results"),
            mip_gap: DEFAULT_MIP_GAP,
        }
    }
}

impl Settings {
    /// Read the settings file from the working directory.
    ///
    /// If the file is not present, default settings will be used.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(Path::new(SETTINGS_FILE_NAME))
    }

    /// Read from the specified path, falling back on defaults when the file is missing
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(file_path)
            .with_context(|| format!("Could not read {}", file_path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Could not parse {}", file_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "log_level = \"warn\"").unwrap();
            writeln!(file, "mip_gap = 0.01").unwrap();
        }

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                mip_gap: Dimensionless(0.01),
                ..Settings::default()
            }
        );
    }

    #[test]
    fn settings_load_from_path_invalid() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "mip_gap = \"not a number\"").unwrap();
        }

        assert!(Settings::load_from_path(&file_path).is_err());
    }
}
