//! End-to-end tests which build and solve dispatch problems for small sites.
use float_cmp::approx_eq;
use mesplan::example::campus_model;
use mesplan::id::FuelID;
use mesplan::model::{GridTariff, Model};
use mesplan::optimisation::{DispatchOutcome, DispatchProblem, DispatchRun, SolveStatus};
use mesplan::period::Horizon;
use mesplan::storage::{StorageDevice, StorageKind, StorageMap};
use mesplan::unit::{PerformanceMap, Unit, UnitInput};
use mesplan::units::{Dimensionless, Energy, Money, MoneyPerEnergy};
use rstest::rstest;
use std::rc::Rc;

/// A site with a single free-running boiler and the given thermal demand.
///
/// The boiler converts fuel to heat one to one with no minimum load and no costs, so tests can
/// tighten individual parameters to isolate one constraint family.
fn boiler_site(thermal_demand: &[f64]) -> Model {
    let gas = FuelID::new("gas");
    let num_periods = thermal_demand.len();
    let boiler = Unit {
        id: "boiler".into(),
        input: UnitInput::Fuel(gas.clone()),
        electrical_output: None,
        thermal_output: Some(PerformanceMap {
            slope: Dimensionless(1.0),
            intercept: Energy(0.0),
        }),
        min_input: Energy(0.0),
        max_input: Energy(1000.0),
        ramp_limit: Energy(1000.0),
        om_cost: Money(0.0),
        startup_cost: Money(0.0),
        max_startups: None,
    };

    Model {
        horizon: Horizon::new(num_periods).unwrap(),
        units: [(boiler.id.clone(), Rc::new(boiler))].into_iter().collect(),
        storages: StorageMap::new(),
        fuel_prices: [(gas, MoneyPerEnergy(0.0))].into_iter().collect(),
        electrical_demand: vec![Energy(0.0); num_periods],
        thermal_demand: thermal_demand.iter().copied().map(Energy).collect(),
        grid: GridTariff {
            buy_prices: vec![MoneyPerEnergy(0.0); num_periods],
            sell_prices: vec![MoneyPerEnergy(0.0); num_periods],
        },
    }
}

/// Replace the boiler in `site` with a modified copy
fn update_boiler(site: &mut Model, update: impl FnOnce(&mut Unit)) {
    let mut boiler = (*site.units["boiler"]).clone();
    update(&mut boiler);
    site.units["boiler"] = boiler.into();
}

/// Add a lossless thermal store with the given capacity to `site`
fn add_thermal_store(site: &mut Model, capacity: f64) {
    let store = StorageDevice {
        id: "TES".into(),
        kind: StorageKind::Thermal {
            dissipation_efficiency: Dimensionless(1.0),
        },
        capacity: Energy(capacity),
    };
    site.storages.insert(store.id.clone(), Rc::new(store));
}

fn solve(site: &Model) -> DispatchOutcome {
    DispatchRun::new(site).run().unwrap()
}

/// The bundled site solves to optimality and the plan respects the model's physics.
#[test]
fn campus_dispatch_is_optimal() {
    let model = campus_model();
    let num_periods = model.horizon.num_periods();

    let problem = DispatchProblem::build(&model).unwrap();
    assert_eq!(problem.num_variables(), 25 * num_periods);
    assert_eq!(problem.num_constraints(), 25 * num_periods);

    let outcome = solve(&model);
    let solution = outcome.solution().expect("campus dispatch should solve");
    assert_eq!(solution.status(), SolveStatus::Optimal);
    assert!(solution.objective_value.value() > 0.0);

    let plan = solution.create_plan();

    // Both energy balances hold in every period
    for t in 0..num_periods {
        let produced: f64 = plan
            .units
            .values()
            .filter_map(|schedule| schedule.electrical_output.as_ref())
            .map(|series| series[t].value())
            .sum();
        let consumed: f64 = plan
            .units
            .values()
            .filter_map(|schedule| schedule.electrical_input.as_ref())
            .map(|series| series[t].value())
            .sum();
        let battery = &plan.storages["BAT"];
        let electrical = produced - consumed
            + plan.grid.bought[t].value()
            - plan.grid.sold[t].value()
            + battery.discharge[t].value()
            - battery.charge[t].value();
        assert!(
            approx_eq!(
                f64,
                electrical,
                model.electrical_demand[t].value(),
                epsilon = 1e-4
            ),
            "electrical balance violated in period {t}"
        );

        let heat: f64 = plan
            .units
            .values()
            .filter_map(|schedule| schedule.thermal_output.as_ref())
            .map(|series| series[t].value())
            .sum();
        let store = &plan.storages["TES"];
        let thermal = heat + store.discharge[t].value() - store.charge[t].value();
        assert!(
            approx_eq!(
                f64,
                thermal,
                model.thermal_demand[t].value(),
                epsilon = 1e-4
            ),
            "thermal balance violated in period {t}"
        );
    }

    // Inputs stay inside the operating range whenever a unit is on and at zero otherwise
    for (unit_id, schedule) in &plan.units {
        let unit = &model.units[unit_id];
        let input = schedule
            .fuel_input
            .as_ref()
            .or(schedule.electrical_input.as_ref())
            .unwrap();
        for t in 0..num_periods {
            let value = input[t].value();
            if schedule.on[t] {
                assert!(
                    value >= unit.min_input.value() - 1e-4
                        && value <= unit.max_input.value() + 1e-4,
                    "unit {unit_id} outside operating range in period {t}"
                );
            } else {
                assert!(
                    approx_eq!(f64, value, 0.0, epsilon = 1e-4),
                    "unit {unit_id} consuming while off in period {t}"
                );
            }
        }
    }

    // Both devices have zero capacity, so their schedules are pinned at zero
    for schedule in plan.storages.values() {
        for t in 0..num_periods {
            assert!(approx_eq!(f64, schedule.charge[t].value(), 0.0, epsilon = 1e-9));
            assert!(approx_eq!(f64, schedule.discharge[t].value(), 0.0, epsilon = 1e-9));
            assert!(approx_eq!(f64, schedule.level[t].value(), 0.0, epsilon = 1e-9));
        }
    }

    // Reconstructing the cost from the plan agrees with the solver's objective
    assert!(approx_eq!(
        f64,
        plan.operating_cost(&model).value(),
        plan.objective.value(),
        epsilon = 0.1
    ));
}

/// With nothing to serve, the cheapest plan leaves every unit off and the grid untouched.
#[test]
fn zero_demand_keeps_units_off() {
    let mut model = campus_model();
    let num_periods = model.horizon.num_periods();
    model.electrical_demand = vec![Energy(0.0); num_periods];
    model.thermal_demand = vec![Energy(0.0); num_periods];

    let outcome = solve(&model);
    let solution = outcome.solution().unwrap();
    assert_eq!(solution.status(), SolveStatus::Optimal);
    assert!(approx_eq!(f64, solution.objective_value.value(), 0.0, epsilon = 1e-6));

    let plan = solution.create_plan();
    for schedule in plan.units.values() {
        assert!(!schedule.on.iter().any(|&on| on));
        assert!(!schedule.startup.iter().any(|&started| started));
    }
    for t in 0..num_periods {
        assert!(approx_eq!(f64, plan.grid.bought[t].value(), 0.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, plan.grid.sold[t].value(), 0.0, epsilon = 1e-6));
    }
}

/// A fixed hourly cost makes switching off in the idle period strictly optimal, and restarting
/// after the off period counts as a startup.
#[test]
fn unit_commitment_follows_demand() {
    let mut site = boiler_site(&[100.0, 0.0]);
    update_boiler(&mut site, |boiler| {
        boiler.om_cost = Money(0.01);
        boiler.startup_cost = Money(0.005);
    });

    let outcome = solve(&site);
    let solution = outcome.solution().unwrap();
    let plan = solution.create_plan();

    let schedule = &plan.units["boiler"];
    assert_eq!(schedule.on, vec![true, false]);
    assert_eq!(schedule.startup, vec![true, false]);

    let fuel = schedule.fuel_input.as_ref().unwrap();
    assert!(approx_eq!(f64, fuel[0].value(), 100.0, epsilon = 1e-6));
    assert!(approx_eq!(f64, fuel[1].value(), 0.0, epsilon = 1e-6));

    // One hour on plus one startup
    assert!(approx_eq!(f64, plan.objective.value(), 0.015, epsilon = 1e-9));
}

/// A unit which stays on over the day boundary incurs no startup, so the objective stays at
/// zero even with an expensive startup cost.
#[test]
fn staying_on_across_the_day_boundary_is_free() {
    let mut site = boiler_site(&[10.0, 10.0, 10.0]);
    update_boiler(&mut site, |boiler| {
        boiler.startup_cost = Money(5.0);
    });

    let outcome = solve(&site);
    let solution = outcome.solution().unwrap();
    assert!(approx_eq!(f64, solution.objective_value.value(), 0.0, epsilon = 1e-9));

    let plan = solution.create_plan();
    let schedule = &plan.units["boiler"];
    assert_eq!(schedule.on, vec![true, true, true]);
    assert!(!schedule.startup.iter().any(|&started| started));
}

/// The ramp limit also applies between the last period and the first.
#[test]
fn ramp_limit_applies_across_the_day_boundary() {
    let mut site = boiler_site(&[100.0, 0.0]);
    update_boiler(&mut site, |boiler| {
        boiler.ramp_limit = Energy(50.0);
    });

    let outcome = solve(&site);
    assert_eq!(outcome.status(), SolveStatus::Infeasible);
    assert!(outcome.solution().is_none());
}

/// Demand beyond the site's installed capacity cannot be served.
#[test]
fn unservable_demand_is_infeasible() {
    let site = boiler_site(&[1500.0]);

    let outcome = solve(&site);
    assert_eq!(outcome.status(), SolveStatus::Infeasible);
    assert!(outcome.solution().is_none());
}

/// Cycling off and back on requires a startup, so a budget of zero makes the pattern
/// infeasible while a budget of one permits it.
#[rstest]
#[case(0, false)]
#[case(1, true)]
fn startup_budget_limits_cycling(#[case] max_startups: u32, #[case] feasible: bool) {
    let mut site = boiler_site(&[100.0, 0.0]);
    update_boiler(&mut site, |boiler| {
        boiler.min_input = Energy(10.0);
        boiler.max_startups = Some(max_startups);
    });

    let outcome = solve(&site);
    assert_eq!(outcome.solution().is_some(), feasible);
    if !feasible {
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
    }
}

/// A peak above boiler capacity is only servable when the thermal store can shift heat
/// produced earlier in the day.
#[rstest]
#[case(600.0, true)]
#[case(0.0, false)]
fn thermal_store_shifts_heat_into_the_peak(#[case] capacity: f64, #[case] feasible: bool) {
    let mut site = boiler_site(&[0.0, 1500.0]);
    add_thermal_store(&mut site, capacity);

    let outcome = solve(&site);
    assert_eq!(outcome.solution().is_some(), feasible);
    let Some(solution) = outcome.solution() else {
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
        return;
    };

    let plan = solution.create_plan();
    let schedule = &plan.units["boiler"];
    let heat = schedule.thermal_output.as_ref().unwrap();

    // The store is lossless, so production over the day matches demand exactly
    let total: f64 = heat.iter().map(|value| value.value()).sum();
    assert!(approx_eq!(f64, total, 1500.0, epsilon = 1e-6));

    // At least the excess over boiler capacity comes out of the store in the peak period
    let store = &plan.storages["TES"];
    let net_discharge = store.discharge[1].value() - store.charge[1].value();
    assert!(net_discharge >= 500.0 - 1e-6);
}

/// A battery buys cheap electricity, stores it with losses and sells it back in the expensive
/// period, making the plan profitable overall.
#[test]
fn battery_arbitrage_earns_revenue() {
    let num_periods = 2;
    let battery = StorageDevice {
        id: "BAT".into(),
        kind: StorageKind::Electrical {
            charge_efficiency: Dimensionless(0.97),
            discharge_efficiency: Dimensionless(0.97),
        },
        capacity: Energy(100.0),
    };
    let model = Model {
        horizon: Horizon::new(num_periods).unwrap(),
        units: Default::default(),
        storages: [(battery.id.clone(), Rc::new(battery))]
            .into_iter()
            .collect(),
        fuel_prices: Default::default(),
        electrical_demand: vec![Energy(0.0); num_periods],
        thermal_demand: vec![Energy(0.0); num_periods],
        grid: GridTariff {
            buy_prices: vec![MoneyPerEnergy(0.10), MoneyPerEnergy(0.30)],
            sell_prices: vec![MoneyPerEnergy(0.01), MoneyPerEnergy(0.25)],
        },
    };

    let outcome = solve(&model);
    let solution = outcome.solution().unwrap();
    let plan = solution.create_plan();

    // Buy at full capacity in the cheap period and sell what survives the round trip
    assert!(approx_eq!(f64, plan.grid.bought[0].value(), 100.0, epsilon = 1e-4));
    assert!(approx_eq!(
        f64,
        plan.grid.sold[1].value(),
        100.0 * 0.97 * 0.97,
        epsilon = 1e-4
    ));

    let expected = 0.10 * 100.0 - 0.25 * 100.0 * 0.97 * 0.97;
    assert!(approx_eq!(f64, plan.objective.value(), expected, epsilon = 1e-4));
    assert!(plan.objective.value() < 0.0);
}
