//! The bundled case study.
//!
//! A university campus site: a reciprocating gas engine, two gas boilers and an electrically
//! driven heat pump meet hourly electrical and thermal demand for one day, alongside a thermal
//! store and a battery (both currently configured with zero capacity, so they stay in the
//! problem but are inert). The site trades with the grid under time-of-day tariffs.
use crate::id::FuelID;
use crate::model::{GridTariff, Model};
use crate::period::Horizon;
use crate::storage::{StorageDevice, StorageKind, StorageMap};
use crate::unit::{PerformanceMap, Unit, UnitInput, UnitMap};
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy};
use std::rc::Rc;

/// Number of hourly periods in the case study
const NUM_PERIODS: usize = 24;

/// Electrical demand per period (kWh)
const ELECTRICAL_DEMAND: [f64; NUM_PERIODS] = [
    1082.5, 1073.1, 1070.7, 1079.7, 1079.5, 1100.1, 1178.0, 1329.2, 1670.6, 1971.4, 2107.7,
    2133.9, 2104.2, 2036.0, 2057.0, 2089.3, 2000.1, 1915.5, 1763.4, 1575.1, 1370.9, 1208.1,
    1155.4, 1102.6,
];

/// Thermal demand per period (kWh)
const THERMAL_DEMAND: [f64; NUM_PERIODS] = [
    300.9, 298.4, 303.0, 552.6, 842.8, 3866.3, 2436.7, 2667.1, 2114.5, 1502.1, 998.6, 772.4,
    738.3, 313.7, 0.0, 0.0, 0.0, 354.2, 332.9, 552.6, 296.0, 322.2, 469.4, 295.9,
];

/// Grid purchase price per period
const BUY_PRICES: [f64; NUM_PERIODS] = [
    0.1272, 0.1272, 0.1272, 0.1272, 0.1272, 0.1272, 0.1272, 0.1496, 0.1514, 0.1514, 0.1514,
    0.1514, 0.1514, 0.1514, 0.1514, 0.1514, 0.1514, 0.1514, 0.1514, 0.1496, 0.1496, 0.1496,
    0.1496, 0.1272,
];

/// Grid sale price per period
const SELL_PRICES: [f64; NUM_PERIODS] = [
    0.0561, 0.0494, 0.0457, 0.0438, 0.0431, 0.0465, 0.0550, 0.0621, 0.0750, 0.0675, 0.0602,
    0.0582, 0.0562, 0.0556, 0.0561, 0.0598, 0.0630, 0.0632, 0.0667, 0.0737, 0.0746, 0.0725,
    0.0632, 0.0550,
];

/// Build the campus case study model.
pub fn campus_model() -> Model {
    let gas = FuelID::new("natural_gas");

    let units: UnitMap = [
        Unit {
            id: "ICE".into(),
            input: UnitInput::Fuel(gas.clone()),
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
        },
        Unit {
            id: "Boiler1".into(),
            input: UnitInput::Fuel(gas.clone()),
            electrical_output: None,
            thermal_output: Some(PerformanceMap {
                slope: Dimensionless(0.976),
                intercept: Energy(-84.75),
            }),
            min_input: Energy(662.1),
            max_input: Energy(2648.3),
            ramp_limit: Energy(2648.3),
            om_cost: Money(0.0),
            startup_cost: Money(4.0),
            max_startups: None,
        },
        Unit {
            id: "Boiler2".into(),
            input: UnitInput::Fuel(gas.clone()),
            electrical_output: None,
            thermal_output: Some(PerformanceMap {
                slope: Dimensionless(0.945),
                intercept: Energy(-54.33),
            }),
            min_input: Energy(424.42),
            max_input: Energy(1697.7),
            ramp_limit: Energy(1697.7),
            om_cost: Money(0.0),
            startup_cost: Money(2.56),
            max_startups: None,
        },
        Unit {
            id: "HP".into(),
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
        },
    ]
    .into_iter()
    .map(|unit| (unit.id.clone(), Rc::new(unit)))
    .collect();

    let storages: StorageMap = [
        StorageDevice {
            id: "TES".into(),
            kind: StorageKind::Thermal {
                dissipation_efficiency: Dimensionless(0.995),
            },
            capacity: Energy(0.0),
        },
        StorageDevice {
            id: "BAT".into(),
            kind: StorageKind::Electrical {
                charge_efficiency: Dimensionless(0.97),
                discharge_efficiency: Dimensionless(0.97),
            },
            capacity: Energy(0.0),
        },
    ]
    .into_iter()
    .map(|storage| (storage.id.clone(), Rc::new(storage)))
    .collect();

    Model {
        horizon: Horizon::new(NUM_PERIODS).unwrap(), // NB: NUM_PERIODS is non-zero
        units,
        storages,
        fuel_prices: [(gas, MoneyPerEnergy(0.03))].into_iter().collect(),
        electrical_demand: ELECTRICAL_DEMAND.iter().copied().map(Energy).collect(),
        thermal_demand: THERMAL_DEMAND.iter().copied().map(Energy).collect(),
        grid: GridTariff {
            buy_prices: BUY_PRICES.iter().copied().map(MoneyPerEnergy).collect(),
            sell_prices: SELL_PRICES.iter().copied().map(MoneyPerEnergy).collect(),
        },
    }
}
