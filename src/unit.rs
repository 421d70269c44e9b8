//! Dispatchable units and their technical parameters.
use crate::id::{FuelID, UnitID};
use crate::units::{Dimensionless, Energy, Money};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use std::rc::Rc;

/// A map of units, keyed by id
pub type UnitMap = IndexMap<UnitID, Rc<Unit>>;

/// The energy carrier a unit consumes.
///
/// The tag decides which input variable the unit's constraints reference and where its running
/// cost comes from: fuel is priced directly, electricity is priced through the electrical
/// balance.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitInput {
    /// The unit burns the given fuel
    Fuel(FuelID),
    /// The unit draws electricity from the site's electrical balance
    Electricity,
}

/// An affine map from a unit's input to one of its outputs.
///
/// Output equals `slope * input + intercept` whenever the unit is on and zero when it is off.
/// With a negative intercept the map crosses zero inside the operating range, which is how
/// part-load efficiency loss is represented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceMap {
    /// Output produced per unit of input
    pub slope: Dimensionless,
    /// Output offset applied whenever the unit is on
    pub intercept: Energy,
}

impl PerformanceMap {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.slope.is_finite() && self.slope > Dimensionless(0.0),
            "A performance map slope must be finite and positive"
        );
        ensure!(self.intercept.is_finite(), "A performance map intercept must be finite");

        Ok(())
    }
}

/// A dispatchable energy conversion unit
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// A unique identifier for the unit
    pub id: UnitID,
    /// The energy carrier the unit consumes
    pub input: UnitInput,
    /// Performance map for electricity production, if the unit produces any
    pub electrical_output: Option<PerformanceMap>,
    /// Performance map for heat production, if the unit produces any
    pub thermal_output: Option<PerformanceMap>,
    /// Smallest input the unit can run at while on
    pub min_input: Energy,
    /// Largest input the unit can take
    pub max_input: Energy,
    /// Largest period-on-period increase in input
    pub ramp_limit: Energy,
    /// Fixed cost per period in which the unit is on
    pub om_cost: Money,
    /// Cost incurred each time the unit starts up
    pub startup_cost: Money,
    /// Cap on the number of startups over the whole horizon, if the unit has one
    pub max_startups: Option<u32>,
}

impl Unit {
    /// Whether the unit burns a priced fuel
    pub fn consumes_fuel(&self) -> bool {
        matches!(self.input, UnitInput::Fuel(_))
    }

    /// Check that the unit's parameters are coherent
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_input.is_finite() && self.min_input >= Energy(0.0),
            "min_input must be finite and non-negative"
        );
        ensure!(
            self.max_input.is_finite() && self.max_input >= self.min_input,
            "max_input must be finite and at least min_input"
        );
        ensure!(
            self.ramp_limit.is_finite() && self.ramp_limit >= Energy(0.0),
            "ramp_limit must be finite and non-negative"
        );
        ensure!(
            self.om_cost.is_finite() && self.om_cost >= Money(0.0),
            "om_cost must be finite and non-negative"
        );
        ensure!(
            self.startup_cost.is_finite() && self.startup_cost >= Money(0.0),
            "startup_cost must be finite and non-negative"
        );
        ensure!(
            self.electrical_output.is_some() || self.thermal_output.is_some(),
            "A unit must produce electricity or heat"
        );
        ensure!(
            self.electrical_output.is_none() || self.consumes_fuel(),
            "Only fuel-consuming units can produce electricity"
        );

        for map in [&self.electrical_output, &self.thermal_output].into_iter().flatten() {
            map.validate()?;
        }

        Ok(())
    }
}
