//! Code for adding constraints to the dispatch problem.
use super::VariableMap;
use crate::model::Model;
use crate::storage::StorageKind;
use crate::unit::UnitInput;
use highs::RowProblem as Problem;

/// Number of rows contributed by each constraint family.
///
/// Every family adds a fixed number of rows per entity and period, so the totals can be checked
/// against the assembled problem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintCounts {
    /// One electrical balance row per period
    pub electrical_balance: usize,
    /// One thermal balance row per period
    pub thermal_balance: usize,
    /// One row per electricity producer and period
    pub electrical_performance: usize,
    /// One row per heat producer and period
    pub thermal_performance: usize,
    /// Two rows per unit and period, one for each end of the band
    pub operating_range: usize,
    /// One row per unit and period
    pub startup: usize,
    /// One row per unit with a startup cap
    pub startup_budget: usize,
    /// One row per unit and period
    pub ramp: usize,
    /// One row per storage device and period
    pub storage_dynamics: usize,
}

impl ConstraintCounts {
    /// Total number of rows across all families
    pub fn total(&self) -> usize {
        self.electrical_balance
            + self.thermal_balance
            + self.electrical_performance
            + self.thermal_performance
            + self.operating_range
            + self.startup
            + self.startup_budget
            + self.ramp
            + self.storage_dynamics
    }
}

/// Add all constraints for the dispatch problem.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `model` - The model
///
/// # Returns
///
/// Row counts per constraint family.
pub fn add_dispatch_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> ConstraintCounts {
    ConstraintCounts {
        electrical_balance: add_electrical_balance_constraints(problem, variables, model),
        thermal_balance: add_thermal_balance_constraints(problem, variables, model),
        electrical_performance: add_electrical_performance_constraints(problem, variables, model),
        thermal_performance: add_thermal_performance_constraints(problem, variables, model),
        operating_range: add_operating_range_constraints(problem, variables, model),
        startup: add_startup_constraints(problem, variables, model),
        startup_budget: add_startup_budget_constraints(problem, variables, model),
        ramp: add_ramp_constraints(problem, variables, model),
        storage_dynamics: add_storage_dynamics_constraints(problem, variables, model),
    }
}

/// Add the electrical balance, one equality row per period.
///
/// Unit production, grid purchases and battery discharge cover demand, electrical unit input,
/// grid sales and battery charge. Curtailment is not modelled, so the row is an equality.
fn add_electrical_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    let mut terms = Vec::new();
    for period in model.horizon.iter() {
        for unit in model.units.values() {
            if unit.electrical_output.is_some() {
                terms.push((variables.get_electrical_output_var(&unit.id, period), 1.0));
            }
            if matches!(unit.input, UnitInput::Electricity) {
                terms.push((variables.get_electrical_input_var(&unit.id, period), -1.0));
            }
        }

        terms.push((variables.get_grid_buy_var(period), 1.0));
        terms.push((variables.get_grid_sell_var(period), -1.0));

        for storage in model.storages.values() {
            if storage.is_electrical() {
                terms.push((variables.get_discharge_var(&storage.id, period), 1.0));
                terms.push((variables.get_charge_var(&storage.id, period), -1.0));
            }
        }

        let demand = model.electrical_demand[period.index()].value();
        problem.add_row(demand..=demand, terms.drain(..));
        count += 1;
    }

    count
}

/// Add the thermal balance, one equality row per period.
///
/// There is no thermal counterpart to the grid, so heat production and store discharge must cover
/// demand and store charge exactly.
fn add_thermal_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    let mut terms = Vec::new();
    for period in model.horizon.iter() {
        for unit in model.units.values() {
            if unit.thermal_output.is_some() {
                terms.push((variables.get_thermal_output_var(&unit.id, period), 1.0));
            }
        }

        for storage in model.storages.values() {
            if storage.is_thermal() {
                terms.push((variables.get_discharge_var(&storage.id, period), 1.0));
                terms.push((variables.get_charge_var(&storage.id, period), -1.0));
            }
        }

        let demand = model.thermal_demand[period.index()].value();
        problem.add_row(demand..=demand, terms.drain(..));
        count += 1;
    }

    count
}

/// Add the electrical performance maps, one equality row per electricity producer and period.
///
/// Output is an affine function of the producing unit's input: output - a*input - b*on = 0. When
/// the unit is off, the operating range pins the input to zero and this row pins the output.
fn add_electrical_performance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    for unit in model.units.values() {
        let Some(map) = unit.electrical_output else {
            continue;
        };

        for period in model.horizon.iter() {
            let output_var = variables.get_electrical_output_var(&unit.id, period);
            let input_var = variables.get_input_var(unit, period);
            let on_var = variables.get_commitment_var(&unit.id, period);
            problem.add_row(
                0.0..=0.0,
                [
                    (output_var, 1.0),
                    (input_var, -map.slope.value()),
                    (on_var, -map.intercept.value()),
                ],
            );
            count += 1;
        }
    }

    count
}

/// Add the thermal performance maps, one equality row per heat producer and period.
///
/// The input variable is the unit's own carrier: fuel for boilers and engines, electricity for
/// heat pumps.
fn add_thermal_performance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    for unit in model.units.values() {
        let Some(map) = unit.thermal_output else {
            continue;
        };

        for period in model.horizon.iter() {
            let output_var = variables.get_thermal_output_var(&unit.id, period);
            let input_var = variables.get_input_var(unit, period);
            let on_var = variables.get_commitment_var(&unit.id, period);
            problem.add_row(
                0.0..=0.0,
                [
                    (output_var, 1.0),
                    (input_var, -map.slope.value()),
                    (on_var, -map.intercept.value()),
                ],
            );
            count += 1;
        }
    }

    count
}

/// Add the operating range rows, two per unit and period.
///
/// input - min*on >= 0 and input - max*on <= 0, so the commitment flag gates the input: off pins
/// it to zero, on frees it within the band.
fn add_operating_range_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    for unit in model.units.values() {
        for period in model.horizon.iter() {
            let input_var = variables.get_input_var(unit, period);
            let on_var = variables.get_commitment_var(&unit.id, period);
            problem.add_row(0.0.., [(input_var, 1.0), (on_var, -unit.min_input.value())]);
            problem.add_row(..=0.0, [(input_var, 1.0), (on_var, -unit.max_input.value())]);
            count += 2;
        }
    }

    count
}

/// Add the startup coupling, one row per unit and period.
///
/// on(p) - on(p-) <= startup(p), with the predecessor taken around the ring. The row only forces
/// the flag up on an off-to-on transition; a positive startup cost is what pins it down
/// elsewhere, so a zero-cost model may report spurious startups.
fn add_startup_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    for unit in model.units.values() {
        for period in model.horizon.iter() {
            let predecessor = period.predecessor(&model.horizon);
            let startup_var = variables.get_startup_var(&unit.id, period);
            if predecessor == period {
                // A single-period ring: the commitment terms cancel
                problem.add_row(..=0.0, [(startup_var, -1.0)]);
            } else {
                let on_var = variables.get_commitment_var(&unit.id, period);
                let previous_on_var = variables.get_commitment_var(&unit.id, predecessor);
                problem.add_row(
                    ..=0.0,
                    [(on_var, 1.0), (previous_on_var, -1.0), (startup_var, -1.0)],
                );
            }
            count += 1;
        }
    }

    count
}

/// Cap the total number of startups for units that declare a limit, one row per such unit.
fn add_startup_budget_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    let mut terms = Vec::new();
    for unit in model.units.values() {
        let Some(max_startups) = unit.max_startups else {
            continue;
        };

        for period in model.horizon.iter() {
            terms.push((variables.get_startup_var(&unit.id, period), 1.0));
        }
        problem.add_row(..=f64::from(max_startups), terms.drain(..));
        count += 1;
    }

    count
}

/// Add the ramp limit, one row per unit and period.
///
/// input(p) - input(p-) <= limit*on(p). Only the increase is bounded, and the limit couples to
/// the current period's commitment flag, so a unit that is off cannot bank ramp headroom.
fn add_ramp_constraints(problem: &mut Problem, variables: &VariableMap, model: &Model) -> usize {
    let mut count = 0;
    for unit in model.units.values() {
        for period in model.horizon.iter() {
            let predecessor = period.predecessor(&model.horizon);
            let on_var = variables.get_commitment_var(&unit.id, period);
            if predecessor == period {
                // A single-period ring: the input terms cancel
                problem.add_row(..=0.0, [(on_var, -unit.ramp_limit.value())]);
            } else {
                let input_var = variables.get_input_var(unit, period);
                let previous_input_var = variables.get_input_var(unit, predecessor);
                problem.add_row(
                    ..=0.0,
                    [
                        (input_var, 1.0),
                        (previous_input_var, -1.0),
                        (on_var, -unit.ramp_limit.value()),
                    ],
                );
            }
            count += 1;
        }
    }

    count
}

/// Add the storage dynamics, one equality row per device and period.
///
/// Thermal stores keep a dissipation-scaled carryover:
/// level(p) - eta*level(p-) = charge - discharge. Electrical stores lose on conversion instead:
/// level(p) - level(p-) = eta_charge*charge - discharge/eta_discharge. The level in the first
/// period links back to the last, closing the ring.
fn add_storage_dynamics_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> usize {
    let mut count = 0;
    for storage in model.storages.values() {
        let (carryover, charge_coeff, discharge_coeff) = match storage.kind {
            StorageKind::Thermal { dissipation_efficiency } => {
                (dissipation_efficiency.value(), 1.0, 1.0)
            }
            StorageKind::Electrical { charge_efficiency, discharge_efficiency } => {
                (1.0, charge_efficiency.value(), 1.0 / discharge_efficiency.value())
            }
        };

        for period in model.horizon.iter() {
            let predecessor = period.predecessor(&model.horizon);
            let level_var = variables.get_level_var(&storage.id, period);
            let charge_var = variables.get_charge_var(&storage.id, period);
            let discharge_var = variables.get_discharge_var(&storage.id, period);
            if predecessor == period {
                // A single-period ring: the level terms collapse into one
                problem.add_row(
                    0.0..=0.0,
                    [
                        (level_var, 1.0 - carryover),
                        (charge_var, -charge_coeff),
                        (discharge_var, discharge_coeff),
                    ],
                );
            } else {
                let previous_level_var = variables.get_level_var(&storage.id, predecessor);
                problem.add_row(
                    0.0..=0.0,
                    [
                        (level_var, 1.0),
                        (previous_level_var, -carryover),
                        (charge_var, -charge_coeff),
                        (discharge_var, discharge_coeff),
                    ],
                );
            }
            count += 1;
        }
    }

    count
}
