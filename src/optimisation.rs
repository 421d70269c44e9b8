//! Code for building and solving the dispatch optimisation problem.
//!
//! The problem is a mixed-integer linear program. Continuous columns carry the energy flows and
//! storage levels, binary columns carry the per-period commitment and startup decisions, and the
//! rows tie them together. Objective coefficients are attached to columns as they are declared,
//! so the objective never exists as a separate expression.
use crate::id::{StorageID, UnitID};
use crate::model::Model;
use crate::period::TimePeriod;
use crate::unit::{Unit, UnitInput};
use crate::units::{Dimensionless, Energy, Money};
use anyhow::{Result, ensure};
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::info;
use std::error::Error;
use std::fmt;
use std::ops::Range;

mod constraints;
pub use constraints::ConstraintCounts;
use constraints::add_dispatch_constraints;

/// The default relative gap below which the solver stops and reports optimality
pub const DEFAULT_MIP_GAP: Dimensionless = Dimensionless(0.005);

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
type Variable = highs::Col;

/// A map of variables keyed by unit and period
type UnitVariableMap = IndexMap<(UnitID, TimePeriod), Variable>;

/// A map of variables keyed by storage device and period
type StorageVariableMap = IndexMap<(StorageID, TimePeriod), Variable>;

/// A map of variables keyed by period alone
type PeriodVariableMap = IndexMap<TimePeriod, Variable>;

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]).
///
/// We use this data structure for two things:
///
/// 1. In order to define constraints for the optimisation
/// 2. To keep track of the combination of parameters that each variable corresponds to, for when
///    we are reading the results of the optimisation.
struct VariableMap {
    fuel_input_vars: UnitVariableMap,
    fuel_input_var_idx: Range<usize>,
    electrical_input_vars: UnitVariableMap,
    electrical_input_var_idx: Range<usize>,
    electrical_output_vars: UnitVariableMap,
    electrical_output_var_idx: Range<usize>,
    thermal_output_vars: UnitVariableMap,
    thermal_output_var_idx: Range<usize>,
    commitment_vars: UnitVariableMap,
    commitment_var_idx: Range<usize>,
    startup_vars: UnitVariableMap,
    startup_var_idx: Range<usize>,
    charge_vars: StorageVariableMap,
    charge_var_idx: Range<usize>,
    discharge_vars: StorageVariableMap,
    discharge_var_idx: Range<usize>,
    level_vars: StorageVariableMap,
    level_var_idx: Range<usize>,
    grid_buy_vars: PeriodVariableMap,
    grid_buy_var_idx: Range<usize>,
    grid_sell_vars: PeriodVariableMap,
    grid_sell_var_idx: Range<usize>,
}

impl VariableMap {
    /// Create a new [`VariableMap`], declaring every decision variable in the problem.
    ///
    /// Families are declared in a fixed order and each records the range of columns it occupies,
    /// so values can be read back positionally from the solution.
    fn new(problem: &mut Problem, model: &Model) -> Self {
        let mut fuel_input_vars = UnitVariableMap::new();
        let fuel_input_var_idx = add_fuel_input_variables(problem, &mut fuel_input_vars, model);
        let mut electrical_input_vars = UnitVariableMap::new();
        let electrical_input_var_idx =
            add_electrical_input_variables(problem, &mut electrical_input_vars, model);
        let mut electrical_output_vars = UnitVariableMap::new();
        let electrical_output_var_idx =
            add_electrical_output_variables(problem, &mut electrical_output_vars, model);
        let mut thermal_output_vars = UnitVariableMap::new();
        let thermal_output_var_idx =
            add_thermal_output_variables(problem, &mut thermal_output_vars, model);
        let mut commitment_vars = UnitVariableMap::new();
        let commitment_var_idx = add_commitment_variables(problem, &mut commitment_vars, model);
        let mut startup_vars = UnitVariableMap::new();
        let startup_var_idx = add_startup_variables(problem, &mut startup_vars, model);
        let mut charge_vars = StorageVariableMap::new();
        let charge_var_idx = add_charge_variables(problem, &mut charge_vars, model);
        let mut discharge_vars = StorageVariableMap::new();
        let discharge_var_idx = add_discharge_variables(problem, &mut discharge_vars, model);
        let mut level_vars = StorageVariableMap::new();
        let level_var_idx = add_level_variables(problem, &mut level_vars, model);
        let mut grid_buy_vars = PeriodVariableMap::new();
        let grid_buy_var_idx = add_grid_buy_variables(problem, &mut grid_buy_vars, model);
        let mut grid_sell_vars = PeriodVariableMap::new();
        let grid_sell_var_idx = add_grid_sell_variables(problem, &mut grid_sell_vars, model);

        Self {
            fuel_input_vars,
            fuel_input_var_idx,
            electrical_input_vars,
            electrical_input_var_idx,
            electrical_output_vars,
            electrical_output_var_idx,
            thermal_output_vars,
            thermal_output_var_idx,
            commitment_vars,
            commitment_var_idx,
            startup_vars,
            startup_var_idx,
            charge_vars,
            charge_var_idx,
            discharge_vars,
            discharge_var_idx,
            level_vars,
            level_var_idx,
            grid_buy_vars,
            grid_buy_var_idx,
            grid_sell_vars,
            grid_sell_var_idx,
        }
    }

    /// Get the input [`Variable`] for the given unit and period.
    ///
    /// The unit's input tag selects between the fuel and electrical input families.
    fn get_input_var(&self, unit: &Unit, period: TimePeriod) -> Variable {
        match &unit.input {
            UnitInput::Fuel(_) => self.get_fuel_input_var(&unit.id, period),
            UnitInput::Electricity => self.get_electrical_input_var(&unit.id, period),
        }
    }

    /// Get the fuel input [`Variable`] corresponding to the given parameters.
    fn get_fuel_input_var(&self, unit_id: &UnitID, period: TimePeriod) -> Variable {
        *self
            .fuel_input_vars
            .get(&(unit_id.clone(), period))
            .expect("No fuel input variable for given params")
    }

    /// Get the electrical input [`Variable`] corresponding to the given parameters.
    fn get_electrical_input_var(&self, unit_id: &UnitID, period: TimePeriod) -> Variable {
        *self
            .electrical_input_vars
            .get(&(unit_id.clone(), period))
            .expect("No electrical input variable for given params")
    }

    /// Get the electrical output [`Variable`] corresponding to the given parameters.
    fn get_electrical_output_var(&self, unit_id: &UnitID, period: TimePeriod) -> Variable {
        *self
            .electrical_output_vars
            .get(&(unit_id.clone(), period))
            .expect("No electrical output variable for given params")
    }

    /// Get the thermal output [`Variable`] corresponding to the given parameters.
    fn get_thermal_output_var(&self, unit_id: &UnitID, period: TimePeriod) -> Variable {
        *self
            .thermal_output_vars
            .get(&(unit_id.clone(), period))
            .expect("No thermal output variable for given params")
    }

    /// Get the commitment [`Variable`] corresponding to the given parameters.
    fn get_commitment_var(&self, unit_id: &UnitID, period: TimePeriod) -> Variable {
        *self
            .commitment_vars
            .get(&(unit_id.clone(), period))
            .expect("No commitment variable for given params")
    }

    /// Get the startup [`Variable`] corresponding to the given parameters.
    fn get_startup_var(&self, unit_id: &UnitID, period: TimePeriod) -> Variable {
        *self
            .startup_vars
            .get(&(unit_id.clone(), period))
            .expect("No startup variable for given params")
    }

    /// Get the charge [`Variable`] corresponding to the given parameters.
    fn get_charge_var(&self, storage_id: &StorageID, period: TimePeriod) -> Variable {
        *self
            .charge_vars
            .get(&(storage_id.clone(), period))
            .expect("No charge variable for given params")
    }

    /// Get the discharge [`Variable`] corresponding to the given parameters.
    fn get_discharge_var(&self, storage_id: &StorageID, period: TimePeriod) -> Variable {
        *self
            .discharge_vars
            .get(&(storage_id.clone(), period))
            .expect("No discharge variable for given params")
    }

    /// Get the state-of-charge [`Variable`] corresponding to the given parameters.
    fn get_level_var(&self, storage_id: &StorageID, period: TimePeriod) -> Variable {
        *self
            .level_vars
            .get(&(storage_id.clone(), period))
            .expect("No level variable for given params")
    }

    /// Get the grid purchase [`Variable`] for the given period.
    fn get_grid_buy_var(&self, period: TimePeriod) -> Variable {
        *self
            .grid_buy_vars
            .get(&period)
            .expect("No grid buy variable for given params")
    }

    /// Get the grid sale [`Variable`] for the given period.
    fn get_grid_sell_var(&self, period: TimePeriod) -> Variable {
        *self
            .grid_sell_vars
            .get(&period)
            .expect("No grid sell variable for given params")
    }
}

/// Terminal status reported by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The solver proved optimality within the configured gap
    Optimal,
    /// No assignment satisfies the constraints
    Infeasible,
    /// The objective can be decreased without bound
    Unbounded,
    /// The solver stopped at a resource limit before proving optimality
    LimitReached,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::LimitReached => "limit reached",
        };
        f.write_str(description)
    }
}

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum SolverError {
    /// The solver itself failed.
    ///
    /// Users should not be able to trigger this error.
    Adapter(HighsStatus),
    /// The solver stopped with a status the adapter has no mapping for
    Unexpected(HighsModelStatus),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Adapter(status) => write!(f, "Solver failure: {status:?}"),
            SolverError::Unexpected(status) => {
                write!(f, "Solver stopped with unexpected status: {status:?}")
            }
        }
    }
}

impl Error for SolverError {}

/// Tuning passed through to the solver.
///
/// The relative MIP gap is the only knob: branch and bound stops once the best bound is within
/// this fraction of the incumbent, and the result still reports as optimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Relative optimality gap below which the search stops
    pub mip_gap: Dimensionless,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self { mip_gap: DEFAULT_MIP_GAP }
    }
}

impl SolverOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.mip_gap.is_finite() && self.mip_gap >= Dimensionless(0.0),
            "mip_gap must be finite and non-negative"
        );

        Ok(())
    }
}

/// A fully-assembled dispatch problem, ready to hand to the solver.
///
/// Building touches no state outside the returned value, so problems for different scenarios can
/// be built and solved independently.
pub struct DispatchProblem {
    problem: Problem,
    variables: VariableMap,
    constraint_counts: ConstraintCounts,
}

impl DispatchProblem {
    /// Build the dispatch problem for the given model.
    ///
    /// The model is validated first; a malformed model is a build error and no problem is
    /// returned.
    pub fn build(model: &Model) -> Result<Self> {
        model.validate()?;

        let mut problem = Problem::default();
        let variables = VariableMap::new(&mut problem, model);
        let constraint_counts = add_dispatch_constraints(&mut problem, &variables, model);

        Ok(Self {
            problem,
            variables,
            constraint_counts,
        })
    }

    /// The number of columns in the problem
    pub fn num_variables(&self) -> usize {
        self.problem.num_cols()
    }

    /// The number of rows in the problem
    pub fn num_constraints(&self) -> usize {
        self.problem.num_rows()
    }

    /// Row counts per constraint family
    pub fn constraint_counts(&self) -> &ConstraintCounts {
        &self.constraint_counts
    }

    /// Solve the problem, blocking until the solver returns.
    ///
    /// All four terminal statuses are ordinary outcomes reported through [`DispatchOutcome`];
    /// only a failure inside the solver itself is an error.
    pub fn solve(self, options: &SolverOptions) -> Result<DispatchOutcome> {
        options.validate()?;

        let mut highs_model = self.problem.optimise(Sense::Minimise);
        highs_model.set_option("output_flag", false);
        highs_model.set_option("mip_rel_gap", options.mip_gap.value());

        let solved = highs_model.try_solve().map_err(SolverError::Adapter)?;
        let outcome = match solved.status() {
            HighsModelStatus::Optimal => {
                DispatchOutcome::Solved(Solution::new(&solved, self.variables, SolveStatus::Optimal))
            }
            HighsModelStatus::Infeasible => DispatchOutcome::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                DispatchOutcome::Unbounded
            }
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                DispatchOutcome::Solved(Solution::new(
                    &solved,
                    self.variables,
                    SolveStatus::LimitReached,
                ))
            }
            status => return Err(SolverError::Unexpected(status).into()),
        };

        Ok(outcome)
    }
}

/// Outcome of a dispatch solve
pub enum DispatchOutcome {
    /// The solver returned a variable assignment, optimal or provisional
    Solved(Solution),
    /// The solver proved that no feasible assignment exists.
    ///
    /// Expected whenever demand cannot be met; not an error.
    Infeasible,
    /// The solver proved the objective unbounded below
    Unbounded,
}

impl DispatchOutcome {
    /// The terminal status reported by the solver
    pub fn status(&self) -> SolveStatus {
        match self {
            Self::Solved(solution) => solution.status(),
            Self::Infeasible => SolveStatus::Infeasible,
            Self::Unbounded => SolveStatus::Unbounded,
        }
    }

    /// The solution, if the solver produced an assignment
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Solved(solution) => Some(solution),
            _ => None,
        }
    }
}

/// The solution to the dispatch problem
pub struct Solution {
    solution: highs::Solution,
    variables: VariableMap,
    status: SolveStatus,
    /// The objective value for the solution
    pub objective_value: Money,
}

impl Solution {
    fn new(solved: &highs::SolvedModel, variables: VariableMap, status: SolveStatus) -> Self {
        Self {
            solution: solved.get_solution(),
            variables,
            status,
            objective_value: Money(solved.objective_value()),
        }
    }

    /// The terminal status the solver stopped with
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Whether the assignment was returned before optimality was proved
    pub fn is_provisional(&self) -> bool {
        self.status == SolveStatus::LimitReached
    }

    /// Zip one variable family's keys with its slice of the column values
    fn zip_values<'a, K>(
        &'a self,
        vars: &'a IndexMap<K, Variable>,
        idx: &Range<usize>,
    ) -> impl Iterator<Item = (&'a K, f64)> {
        vars.keys()
            .zip(self.solution.columns()[idx.clone()].iter().copied())
    }

    /// Fuel consumed by each fuel-burning unit in each period
    pub fn iter_fuel_inputs(&self) -> impl Iterator<Item = (&UnitID, TimePeriod, Energy)> {
        self.zip_values(&self.variables.fuel_input_vars, &self.variables.fuel_input_var_idx)
            .map(|((unit_id, period), value)| (unit_id, *period, Energy(value)))
    }

    /// Electricity drawn by each electricity-consuming unit in each period
    pub fn iter_electrical_inputs(&self) -> impl Iterator<Item = (&UnitID, TimePeriod, Energy)> {
        self.zip_values(
            &self.variables.electrical_input_vars,
            &self.variables.electrical_input_var_idx,
        )
        .map(|((unit_id, period), value)| (unit_id, *period, Energy(value)))
    }

    /// Electricity produced by each electricity-producing unit in each period
    pub fn iter_electrical_outputs(&self) -> impl Iterator<Item = (&UnitID, TimePeriod, Energy)> {
        self.zip_values(
            &self.variables.electrical_output_vars,
            &self.variables.electrical_output_var_idx,
        )
        .map(|((unit_id, period), value)| (unit_id, *period, Energy(value)))
    }

    /// Heat produced by each heat-producing unit in each period
    pub fn iter_thermal_outputs(&self) -> impl Iterator<Item = (&UnitID, TimePeriod, Energy)> {
        self.zip_values(
            &self.variables.thermal_output_vars,
            &self.variables.thermal_output_var_idx,
        )
        .map(|((unit_id, period), value)| (unit_id, *period, Energy(value)))
    }

    /// Whether each unit is on in each period
    pub fn iter_commitments(&self) -> impl Iterator<Item = (&UnitID, TimePeriod, bool)> {
        self.zip_values(&self.variables.commitment_vars, &self.variables.commitment_var_idx)
            .map(|((unit_id, period), value)| (unit_id, *period, value > 0.5))
    }

    /// Whether each unit starts up in each period
    pub fn iter_startups(&self) -> impl Iterator<Item = (&UnitID, TimePeriod, bool)> {
        self.zip_values(&self.variables.startup_vars, &self.variables.startup_var_idx)
            .map(|((unit_id, period), value)| (unit_id, *period, value > 0.5))
    }

    /// Energy charged into each storage device in each period
    pub fn iter_storage_charges(&self) -> impl Iterator<Item = (&StorageID, TimePeriod, Energy)> {
        self.zip_values(&self.variables.charge_vars, &self.variables.charge_var_idx)
            .map(|((storage_id, period), value)| (storage_id, *period, Energy(value)))
    }

    /// Energy discharged from each storage device in each period
    pub fn iter_storage_discharges(
        &self,
    ) -> impl Iterator<Item = (&StorageID, TimePeriod, Energy)> {
        self.zip_values(&self.variables.discharge_vars, &self.variables.discharge_var_idx)
            .map(|((storage_id, period), value)| (storage_id, *period, Energy(value)))
    }

    /// State of charge of each storage device in each period
    pub fn iter_storage_levels(&self) -> impl Iterator<Item = (&StorageID, TimePeriod, Energy)> {
        self.zip_values(&self.variables.level_vars, &self.variables.level_var_idx)
            .map(|((storage_id, period), value)| (storage_id, *period, Energy(value)))
    }

    /// Electricity bought from the grid in each period
    pub fn iter_grid_buys(&self) -> impl Iterator<Item = (TimePeriod, Energy)> {
        self.zip_values(&self.variables.grid_buy_vars, &self.variables.grid_buy_var_idx)
            .map(|(period, value)| (*period, Energy(value)))
    }

    /// Electricity sold to the grid in each period
    pub fn iter_grid_sells(&self) -> impl Iterator<Item = (TimePeriod, Energy)> {
        self.zip_values(&self.variables.grid_sell_vars, &self.variables.grid_sell_var_idx)
            .map(|(period, value)| (*period, Energy(value)))
    }
}

/// Provides the interface for building and solving a dispatch problem in one step.
pub struct DispatchRun<'model> {
    model: &'model Model,
    options: SolverOptions,
}

impl<'model> DispatchRun<'model> {
    /// Create a new [`DispatchRun`] for the specified model
    pub fn new(model: &'model Model) -> Self {
        Self {
            model,
            options: SolverOptions::default(),
        }
    }

    /// Override the relative optimality gap passed to the solver
    pub fn with_mip_gap(self, mip_gap: Dimensionless) -> Self {
        Self {
            options: SolverOptions { mip_gap },
            ..self
        }
    }

    /// Build the dispatch problem and solve it.
    pub fn run(self) -> Result<DispatchOutcome> {
        let problem = DispatchProblem::build(self.model)?;
        info!(
            "Built dispatch problem with {} variables and {} constraints",
            problem.num_variables(),
            problem.num_constraints()
        );

        problem.solve(&self.options)
    }
}

/// Add fuel input variables, one per fuel-consuming unit and period.
///
/// The objective picks up the fuel cost term here: each column's coefficient is the price of the
/// unit's fuel.
fn add_fuel_input_variables(
    problem: &mut Problem,
    variables: &mut UnitVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for unit in model.units.values() {
        let UnitInput::Fuel(fuel_id) = &unit.input else {
            continue;
        };

        let price = model.fuel_price(fuel_id);
        for period in model.horizon.iter() {
            let var = problem.add_column(price.value(), 0.0..);
            let existing = variables.insert((unit.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add electrical input variables, one per electricity-consuming unit and period.
///
/// These columns carry no direct cost; drawing electricity is priced through the electrical
/// balance, as grid purchases or displaced sales.
fn add_electrical_input_variables(
    problem: &mut Problem,
    variables: &mut UnitVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for unit in model.units.values() {
        if !matches!(unit.input, UnitInput::Electricity) {
            continue;
        }

        for period in model.horizon.iter() {
            let var = problem.add_column(0.0, 0.0..);
            let existing = variables.insert((unit.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add electrical output variables, one per electricity-producing unit and period.
fn add_electrical_output_variables(
    problem: &mut Problem,
    variables: &mut UnitVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for unit in model.units.values() {
        if unit.electrical_output.is_none() {
            continue;
        }

        for period in model.horizon.iter() {
            let var = problem.add_column(0.0, 0.0..);
            let existing = variables.insert((unit.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add thermal output variables, one per heat-producing unit and period.
fn add_thermal_output_variables(
    problem: &mut Problem,
    variables: &mut UnitVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for unit in model.units.values() {
        if unit.thermal_output.is_none() {
            continue;
        }

        for period in model.horizon.iter() {
            let var = problem.add_column(0.0, 0.0..);
            let existing = variables.insert((unit.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add binary commitment variables, one per unit and period.
///
/// The objective picks up the O&M cost term here.
fn add_commitment_variables(
    problem: &mut Problem,
    variables: &mut UnitVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for unit in model.units.values() {
        for period in model.horizon.iter() {
            let var = problem.add_integer_column(unit.om_cost.value(), 0.0..=1.0);
            let existing = variables.insert((unit.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add binary startup variables, one per unit and period.
///
/// The objective picks up the startup cost term here.
fn add_startup_variables(
    problem: &mut Problem,
    variables: &mut UnitVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for unit in model.units.values() {
        for period in model.horizon.iter() {
            let var = problem.add_integer_column(unit.startup_cost.value(), 0.0..=1.0);
            let existing = variables.insert((unit.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add charge flow variables, one per storage device and period.
///
/// Flows are bounded by the device capacity, so a zero-capacity device is pinned to zero charge
/// in every feasible solution, not only in optimal ones.
fn add_charge_variables(
    problem: &mut Problem,
    variables: &mut StorageVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for storage in model.storages.values() {
        for period in model.horizon.iter() {
            let var = problem.add_column(0.0, 0.0..=storage.capacity.value());
            let existing = variables.insert((storage.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add discharge flow variables, one per storage device and period, bounded by capacity.
fn add_discharge_variables(
    problem: &mut Problem,
    variables: &mut StorageVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for storage in model.storages.values() {
        for period in model.horizon.iter() {
            let var = problem.add_column(0.0, 0.0..=storage.capacity.value());
            let existing = variables.insert((storage.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add state-of-charge variables, one per storage device and period, bounded by capacity.
fn add_level_variables(
    problem: &mut Problem,
    variables: &mut StorageVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for storage in model.storages.values() {
        for period in model.horizon.iter() {
            let var = problem.add_column(0.0, 0.0..=storage.capacity.value());
            let existing = variables.insert((storage.id.clone(), period), var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    start..problem.num_cols()
}

/// Add grid purchase variables, one per period, with the buy price as the cost coefficient.
fn add_grid_buy_variables(
    problem: &mut Problem,
    variables: &mut PeriodVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for period in model.horizon.iter() {
        let price = model.grid.buy_prices[period.index()];
        let var = problem.add_column(price.value(), 0.0..);
        let existing = variables.insert(period, var).is_some();
        assert!(!existing, "Duplicate entry for var");
    }

    start..problem.num_cols()
}

/// Add grid sale variables, one per period.
///
/// Sales earn revenue, so the cost coefficient is the negated sell price.
fn add_grid_sell_variables(
    problem: &mut Problem,
    variables: &mut PeriodVariableMap,
    model: &Model,
) -> Range<usize> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for period in model.horizon.iter() {
        let price = model.grid.sell_prices[period.index()];
        let var = problem.add_column(-price.value(), 0.0..);
        let existing = variables.insert(period, var).is_some();
        assert!(!existing, "Duplicate entry for var");
    }

    start..problem.num_cols()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::site;
    use crate::units::Energy;
    use rstest::rstest;

    #[rstest]
    fn test_variable_count(site: Model) {
        let problem = DispatchProblem::build(&site).unwrap();

        // Per period: one fuel input (engine), one electrical input (heat pump), two thermal
        // outputs, one electrical output, commitment and startup flags for both units, charge,
        // discharge and level for both stores and the grid buy and sell pair
        let num_periods = site.horizon.num_periods();
        let expected = num_periods * (1 + 1 + 2 + 1 + 2 + 2 + 6 + 2);
        assert_eq!(problem.num_variables(), expected);
    }

    #[rstest]
    fn test_constraint_count_matches_problem(site: Model) {
        let problem = DispatchProblem::build(&site).unwrap();
        assert_eq!(problem.num_constraints(), problem.constraint_counts().total());
    }

    #[rstest]
    fn test_constraint_counts_per_family(site: Model) {
        let problem = DispatchProblem::build(&site).unwrap();
        let num_periods = site.horizon.num_periods();

        let counts = problem.constraint_counts();
        assert_eq!(counts.electrical_balance, num_periods);
        assert_eq!(counts.thermal_balance, num_periods);
        assert_eq!(counts.electrical_performance, num_periods);
        assert_eq!(counts.thermal_performance, 2 * num_periods);
        assert_eq!(counts.operating_range, 2 * 2 * num_periods);
        assert_eq!(counts.startup, 2 * num_periods);
        assert_eq!(counts.startup_budget, 0);
        assert_eq!(counts.ramp, 2 * num_periods);
        assert_eq!(counts.storage_dynamics, 2 * num_periods);
    }

    #[rstest]
    fn test_build_rejects_invalid_model(mut site: Model) {
        site.electrical_demand.pop();
        assert!(DispatchProblem::build(&site).is_err());
    }

    #[rstest]
    fn test_startup_budget_row_per_limited_unit(mut site: Model) {
        let mut engine = (*site.units["engine"]).clone();
        engine.max_startups = Some(2);
        site.units["engine"] = engine.into();

        let problem = DispatchProblem::build(&site).unwrap();
        assert_eq!(problem.constraint_counts().startup_budget, 1);
    }

    #[rstest]
    fn test_solver_options_validation(site: Model) {
        let problem = DispatchProblem::build(&site).unwrap();
        let options = SolverOptions { mip_gap: Dimensionless(-0.1) };
        assert!(problem.solve(&options).is_err());
    }

    #[rstest]
    fn test_zero_capacity_bounds_are_explicit(mut site: Model) {
        for storage in site.storages.values_mut() {
            let mut storage_data = (**storage).clone();
            storage_data.capacity = Energy(0.0);
            *storage = storage_data.into();
        }

        // Still builds: the device stays in the problem with fixed-at-zero columns
        DispatchProblem::build(&site).unwrap();
    }
}
