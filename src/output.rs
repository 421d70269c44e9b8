//! Writing projected plans and run metadata to the output directory.
use crate::id::{StorageID, UnitID};
use crate::plan::OperatingPlan;
use crate::units::Energy;
use anyhow::{Context, Result, ensure};
use chrono::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The output filename for per-unit schedules
const UNITS_FILE_NAME: &str = "units.csv";
/// The output filename for storage schedules
const STORAGE_FILE_NAME: &str = "storage.csv";
/// The output filename for grid exchange
const GRID_FILE_NAME: &str = "grid.csv";
/// The output filename used for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Resolve the default output directory under the results root, named by start time.
pub fn get_output_dir(results_root: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    results_root.join(format!("run_{timestamp}"))
}

/// Create the output directory, replacing any previous contents when overwriting is allowed.
///
/// # Returns
///
/// Whether an existing directory was replaced.
pub fn create_output_directory(output_path: &Path, overwrite: bool) -> Result<bool> {
    if output_path.exists() {
        ensure!(
            overwrite,
            "Output directory {} already exists",
            output_path.display()
        );
        fs::remove_dir_all(output_path)?;
        fs::create_dir_all(output_path)?;
        return Ok(true);
    }

    fs::create_dir_all(output_path)?;
    Ok(false)
}

/// A row of the units CSV file
#[derive(Serialize)]
struct UnitRow<'a> {
    unit: &'a UnitID,
    period: usize,
    fuel_input: Option<Energy>,
    electrical_input: Option<Energy>,
    electrical_output: Option<Energy>,
    thermal_output: Option<Energy>,
    on: bool,
    startup: bool,
}

/// A row of the storage CSV file
#[derive(Serialize)]
struct StorageRow<'a> {
    storage: &'a StorageID,
    period: usize,
    charge: Energy,
    discharge: Energy,
    level: Energy,
}

/// A row of the grid CSV file
#[derive(Serialize)]
struct GridRow {
    period: usize,
    bought: Energy,
    sold: Energy,
}

/// An object for writing output data to disk
pub struct DataWriter {
    units_writer: csv::Writer<fs::File>,
    storage_writer: csv::Writer<fs::File>,
    grid_writer: csv::Writer<fs::File>,
}

impl DataWriter {
    /// Open CSV writers for the given output path
    pub fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            units_writer: new_csv_writer(output_path, UNITS_FILE_NAME)?,
            storage_writer: new_csv_writer(output_path, STORAGE_FILE_NAME)?,
            grid_writer: new_csv_writer(output_path, GRID_FILE_NAME)?,
        })
    }

    /// Write all of the plan's schedules
    pub fn write_plan(&mut self, plan: &OperatingPlan) -> Result<()> {
        self.write_unit_schedules(plan)?;
        self.write_storage_schedules(plan)?;
        self.write_grid_schedule(plan)?;

        Ok(())
    }

    fn write_unit_schedules(&mut self, plan: &OperatingPlan) -> Result<()> {
        for (unit_id, schedule) in &plan.units {
            for period in 0..schedule.on.len() {
                let row = UnitRow {
                    unit: unit_id,
                    period,
                    fuel_input: series_value(&schedule.fuel_input, period),
                    electrical_input: series_value(&schedule.electrical_input, period),
                    electrical_output: series_value(&schedule.electrical_output, period),
                    thermal_output: series_value(&schedule.thermal_output, period),
                    on: schedule.on[period],
                    startup: schedule.startup[period],
                };
                self.units_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    fn write_storage_schedules(&mut self, plan: &OperatingPlan) -> Result<()> {
        for (storage_id, schedule) in &plan.storages {
            for period in 0..schedule.level.len() {
                let row = StorageRow {
                    storage: storage_id,
                    period,
                    charge: schedule.charge[period],
                    discharge: schedule.discharge[period],
                    level: schedule.level[period],
                };
                self.storage_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    fn write_grid_schedule(&mut self, plan: &OperatingPlan) -> Result<()> {
        for period in 0..plan.grid.bought.len() {
            let row = GridRow {
                period,
                bought: plan.grid.bought[period],
                sold: plan.grid.sold[period],
            };
            self.grid_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush all writers
    pub fn flush(&mut self) -> Result<()> {
        self.units_writer.flush()?;
        self.storage_writer.flush()?;
        self.grid_writer.flush()?;

        Ok(())
    }
}

/// Open a CSV writer for the given file under the output path
fn new_csv_writer(output_path: &Path, file_name: &str) -> Result<csv::Writer<fs::File>> {
    let file_path = output_path.join(file_name);
    csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))
}

/// The value at `period`, if the series is present
fn series_value(series: &Option<Vec<Energy>>, period: usize) -> Option<Energy> {
    series.as_ref().map(|values| values[period])
}

/// Top-level metadata structure serialized to TOML
#[derive(Serialize)]
struct Metadata {
    run: RunMetadata,
    program: ProgramMetadata,
}

/// Information about the run
#[derive(Serialize)]
struct RunMetadata {
    /// The date and time on which the run started
    datetime: String,
    /// Status the solver finished with
    status: String,
    /// Objective value of the projected plan
    objective: f64,
}

/// Information about the program
#[derive(Serialize)]
struct ProgramMetadata {
    /// The program name
    name: &'static str,
    /// The program version as specified in Cargo.toml
    version: &'static str,
}

/// Write metadata to `metadata.toml` in the given output directory.
///
/// # Arguments
///
/// * `output_path` - Directory where `metadata.toml` will be written.
/// * `plan` - The plan that was written alongside the metadata.
pub fn write_metadata(output_path: &Path, plan: &OperatingPlan) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            datetime: Local::now().to_rfc2822(),
            status: plan.status.to_string(),
            objective: plan.objective.value(),
        },
        program: ProgramMetadata {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}
