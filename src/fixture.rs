//! Fixtures for tests
use crate::id::FuelID;
use crate::model::{GridTariff, Model};
use crate::period::Horizon;
use crate::storage::{StorageDevice, StorageKind, StorageMap};
use crate::unit::{PerformanceMap, Unit, UnitInput, UnitMap};
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy};
use rstest::fixture;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A fuel-burning engine producing both electricity and heat
#[fixture]
pub fn engine() -> Unit {
    Unit {
        id: "engine".into(),
        input: UnitInput::Fuel("gas".into()),
        electrical_output: Some(PerformanceMap {
            slope: Dimensionless(0.49),
            intercept: Energy(-191.03),
        }),
        thermal_output: Some(PerformanceMap {
            slope: Dimensionless(0.439),
            intercept: Energy(-74.75),
        }),
        min_input: Energy(1829.3),
        max_input: Energy(3658.5),
        ramp_limit: Energy(3658.5),
        om_cost: Money(9.46),
        startup_cost: Money(8.45),
        max_startups: None,
    }
}

/// An electricity-consuming heat pump
#[fixture]
pub fn heat_pump() -> Unit {
    Unit {
        id: "heat_pump".into(),
        input: UnitInput::Electricity,
        electrical_output: None,
        thermal_output: Some(PerformanceMap {
            slope: Dimensionless(3.59),
            intercept: Energy(-51.28),
        }),
        min_input: Energy(83.3),
        max_input: Energy(641.0),
        ramp_limit: Energy(641.0),
        om_cost: Money(13.28),
        startup_cost: Money(9.13),
        max_startups: None,
    }
}

/// A thermal store with some dissipation
#[fixture]
pub fn heat_store() -> StorageDevice {
    StorageDevice {
        id: "heat_store".into(),
        kind: StorageKind::Thermal {
            dissipation_efficiency: Dimensionless(0.995),
        },
        capacity: Energy(500.0),
    }
}

/// A battery with symmetric conversion losses
#[fixture]
pub fn battery() -> StorageDevice {
    StorageDevice {
        id: "battery".into(),
        kind: StorageKind::Electrical {
            charge_efficiency: Dimensionless(0.97),
            discharge_efficiency: Dimensionless(0.97),
        },
        capacity: Energy(200.0),
    }
}

/// A two-unit site with a store of each kind over a four-period horizon
#[fixture]
pub fn site(
    engine: Unit,
    heat_pump: Unit,
    heat_store: StorageDevice,
    battery: StorageDevice,
) -> Model {
    let units: UnitMap = [engine, heat_pump]
        .into_iter()
        .map(|unit| (unit.id.clone(), Rc::new(unit)))
        .collect();
    let storages: StorageMap = [heat_store, battery]
        .into_iter()
        .map(|storage| (storage.id.clone(), Rc::new(storage)))
        .collect();

    Model {
        horizon: Horizon::new(4).unwrap(),
        units,
        storages,
        fuel_prices: [(FuelID::new("gas"), MoneyPerEnergy(0.03))]
            .into_iter()
            .collect(),
        electrical_demand: vec![Energy(0.0); 4],
        thermal_demand: vec![Energy(0.0); 4],
        grid: GridTariff {
            buy_prices: vec![MoneyPerEnergy(0.1); 4],
            sell_prices: vec![MoneyPerEnergy(0.05); 4],
        },
    }
}
