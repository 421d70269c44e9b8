//! mesplan computes least-cost operating plans for a small multi-energy site.
//!
//! The site model (generating units, storage devices, demand and tariff series) is turned into a
//! mixed-integer linear program over a cyclic daily horizon and handed to the HiGHS solver. The
//! resulting schedules can be written to CSV files for further analysis.
pub mod cli;
pub mod example;
#[cfg(test)]
pub(crate) mod fixture;
pub mod id;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod period;
pub mod plan;
pub mod settings;
pub mod storage;
pub mod unit;
pub mod units;

/// The URL of the issue tracker
pub const ISSUES_URL: &str = "https://github.com/EnergySystemsModellingLab/mesplan/issues";
