//! Projection of a solved dispatch problem into per-entity schedules.
//!
//! The solver hands back one flat value per column. The operating plan regroups those values
//! into named series ordered by period for each unit, each storage device and the grid
//! connection, which is the shape callers inspect and write to file.
use crate::id::{StorageID, UnitID};
use crate::model::Model;
use crate::optimisation::{SolveStatus, Solution};
use crate::unit::UnitInput;
use crate::units::{Energy, Money};
use indexmap::IndexMap;

/// Per-period series for one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitSchedule {
    /// Fuel consumed per period, for fuel-consuming units
    pub fuel_input: Option<Vec<Energy>>,
    /// Electricity drawn per period, for electricity-consuming units
    pub electrical_input: Option<Vec<Energy>>,
    /// Electricity produced per period, for electricity producers
    pub electrical_output: Option<Vec<Energy>>,
    /// Heat produced per period, for heat producers
    pub thermal_output: Option<Vec<Energy>>,
    /// Whether the unit is on in each period
    pub on: Vec<bool>,
    /// Whether the unit starts up in each period
    pub startup: Vec<bool>,
}

/// Per-period series for one storage device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageSchedule {
    /// Energy charged into the device per period
    pub charge: Vec<Energy>,
    /// Energy discharged from the device per period
    pub discharge: Vec<Energy>,
    /// State of charge at the end of each period
    pub level: Vec<Energy>,
}

/// Per-period series for the grid connection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridSchedule {
    /// Electricity bought per period
    pub bought: Vec<Energy>,
    /// Electricity sold per period
    pub sold: Vec<Energy>,
}

/// An operating plan for the site, projected from a solver assignment
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPlan {
    /// Status the solver stopped with; a limit-reached plan is provisional
    pub status: SolveStatus,
    /// Objective value of the assignment the plan was projected from
    pub objective: Money,
    /// Schedules per unit
    pub units: IndexMap<UnitID, UnitSchedule>,
    /// Schedules per storage device
    pub storages: IndexMap<StorageID, StorageSchedule>,
    /// Grid exchange schedule
    pub grid: GridSchedule,
}

impl Solution {
    /// Project the flat variable assignment into per-entity schedules.
    ///
    /// Each family iterates in (entity, period) insertion order, so pushing onto the series
    /// preserves period order within each entity.
    pub fn create_plan(&self) -> OperatingPlan {
        let mut units: IndexMap<UnitID, UnitSchedule> = IndexMap::new();
        for (unit_id, _, value) in self.iter_fuel_inputs() {
            units
                .entry(unit_id.clone())
                .or_default()
                .fuel_input
                .get_or_insert_with(Vec::new)
                .push(value);
        }
        for (unit_id, _, value) in self.iter_electrical_inputs() {
            units
                .entry(unit_id.clone())
                .or_default()
                .electrical_input
                .get_or_insert_with(Vec::new)
                .push(value);
        }
        for (unit_id, _, value) in self.iter_electrical_outputs() {
            units
                .entry(unit_id.clone())
                .or_default()
                .electrical_output
                .get_or_insert_with(Vec::new)
                .push(value);
        }
        for (unit_id, _, value) in self.iter_thermal_outputs() {
            units
                .entry(unit_id.clone())
                .or_default()
                .thermal_output
                .get_or_insert_with(Vec::new)
                .push(value);
        }
        for (unit_id, _, on) in self.iter_commitments() {
            units.entry(unit_id.clone()).or_default().on.push(on);
        }
        for (unit_id, _, startup) in self.iter_startups() {
            units.entry(unit_id.clone()).or_default().startup.push(startup);
        }

        let mut storages: IndexMap<StorageID, StorageSchedule> = IndexMap::new();
        for (storage_id, _, value) in self.iter_storage_charges() {
            storages.entry(storage_id.clone()).or_default().charge.push(value);
        }
        for (storage_id, _, value) in self.iter_storage_discharges() {
            storages.entry(storage_id.clone()).or_default().discharge.push(value);
        }
        for (storage_id, _, value) in self.iter_storage_levels() {
            storages.entry(storage_id.clone()).or_default().level.push(value);
        }

        let grid = GridSchedule {
            bought: self.iter_grid_buys().map(|(_, value)| value).collect(),
            sold: self.iter_grid_sells().map(|(_, value)| value).collect(),
        };

        OperatingPlan {
            status: self.status(),
            objective: self.objective_value,
            units,
            storages,
            grid,
        }
    }
}

impl OperatingPlan {
    /// Recompute the plan's cost from the projected series.
    ///
    /// Sums the fuel, O&M, startup and net grid terms with the model's prices. The result matches
    /// the solver's objective value up to numerical tolerance, which makes the projection
    /// checkable without reaching back into the solver.
    pub fn operating_cost(&self, model: &Model) -> Money {
        let mut cost = Money(0.0);
        for (unit_id, schedule) in &self.units {
            let unit = &model.units[unit_id];
            if let (UnitInput::Fuel(fuel_id), Some(fuel_input)) =
                (&unit.input, &schedule.fuel_input)
            {
                let price = model.fuel_prices[fuel_id];
                cost += fuel_input.iter().map(|&fuel| price * fuel).sum();
            }

            let periods_on = schedule.on.iter().filter(|&&on| on).count();
            cost += unit.om_cost * periods_on as f64;

            let startups = schedule.startup.iter().filter(|&&startup| startup).count();
            cost += unit.startup_cost * startups as f64;
        }

        for (period, bought) in self.grid.bought.iter().enumerate() {
            cost += model.grid.buy_prices[period] * *bought;
        }
        for (period, sold) in self.grid.sold.iter().enumerate() {
            cost -= model.grid.sell_prices[period] * *sold;
        }

        cost
    }
}
