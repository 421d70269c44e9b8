//! The static description of a site: its units, storage devices, tariffs and demand.
use crate::id::FuelID;
use crate::period::Horizon;
use crate::storage::StorageMap;
use crate::unit::{UnitInput, UnitMap};
use crate::units::{Energy, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

/// Per-period prices for exchange with the electricity grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridTariff {
    /// Price paid per unit of electricity bought from the grid
    pub buy_prices: Vec<MoneyPerEnergy>,
    /// Price received per unit of electricity sold to the grid
    pub sell_prices: Vec<MoneyPerEnergy>,
}

/// A model of a site over one cyclic horizon.
///
/// All series are indexed by period. The model is plain data; building and solving the dispatch
/// problem for it lives in the [`optimisation`](crate::optimisation) module.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// The cyclic horizon to dispatch over
    pub horizon: Horizon,
    /// The dispatchable units on the site
    pub units: UnitMap,
    /// The storage devices on the site
    pub storages: StorageMap,
    /// Price per unit of each fuel consumed on the site
    pub fuel_prices: IndexMap<FuelID, MoneyPerEnergy>,
    /// Electrical demand per period
    pub electrical_demand: Vec<Energy>,
    /// Thermal demand per period
    pub thermal_demand: Vec<Energy>,
    /// Prices for exchange with the electricity grid
    pub grid: GridTariff,
}

impl Model {
    /// Check that the model is coherent.
    ///
    /// Every unit and storage device must validate, every fuel a unit burns must have a price and
    /// every series must cover the horizon with finite values.
    pub fn validate(&self) -> Result<()> {
        for (id, unit) in &self.units {
            unit.validate()
                .with_context(|| format!("Invalid parameters for unit {id}"))?;

            if let UnitInput::Fuel(fuel_id) = &unit.input {
                ensure!(
                    self.fuel_prices.contains_key(fuel_id),
                    "Unit {id} consumes fuel {fuel_id}, which has no configured price"
                );
            }
        }

        for (id, storage) in &self.storages {
            storage
                .validate()
                .with_context(|| format!("Invalid parameters for storage device {id}"))?;
        }

        for (fuel_id, price) in &self.fuel_prices {
            ensure!(price.is_finite(), "Fuel {fuel_id} has a non-finite price");
        }

        let num_periods = self.horizon.num_periods();
        check_demand_series(&self.electrical_demand, num_periods, "electrical demand")?;
        check_demand_series(&self.thermal_demand, num_periods, "thermal demand")?;
        check_price_series(&self.grid.buy_prices, num_periods, "grid buy price")?;
        check_price_series(&self.grid.sell_prices, num_periods, "grid sell price")?;

        Ok(())
    }

    /// The price of the given fuel.
    ///
    /// Panics if the fuel is unknown; [`Model::validate`] checks every referenced fuel first.
    pub(crate) fn fuel_price(&self, fuel_id: &FuelID) -> MoneyPerEnergy {
        self.fuel_prices[fuel_id]
    }
}

/// Check that a demand series covers the horizon with finite, non-negative values
fn check_demand_series(series: &[Energy], num_periods: usize, name: &str) -> Result<()> {
    ensure!(
        series.len() == num_periods,
        "The {name} series has {} entries but the horizon has {num_periods} periods",
        series.len()
    );
    ensure!(
        series.iter().all(|demand| demand.is_finite() && *demand >= Energy(0.0)),
        "The {name} series must contain only finite, non-negative values"
    );

    Ok(())
}

/// Check that a price series covers the horizon with finite values
fn check_price_series(series: &[MoneyPerEnergy], num_periods: usize, name: &str) -> Result<()> {
    ensure!(
        series.len() == num_periods,
        "The {name} series has {} entries but the horizon has {num_periods} periods",
        series.len()
    );
    ensure!(
        series.iter().all(MoneyPerEnergy::is_finite),
        "The {name} series must contain only finite values"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, site};
    use rstest::rstest;

    #[rstest]
    fn test_validate_valid(site: Model) {
        site.validate().unwrap();
    }

    #[rstest]
    fn test_validate_missing_fuel_price(mut site: Model) {
        site.fuel_prices.clear();
        assert_error!(
            site.validate(),
            "Unit engine consumes fuel gas, which has no configured price"
        );
    }

    #[rstest]
    fn test_validate_series_length(mut site: Model) {
        site.thermal_demand.pop();
        assert_error!(
            site.validate(),
            "The thermal demand series has 3 entries but the horizon has 4 periods"
        );
    }

    #[rstest]
    fn test_validate_negative_demand(mut site: Model) {
        site.electrical_demand[0] = Energy(-1.0);
        assert_error!(
            site.validate(),
            "The electrical demand series must contain only finite, non-negative values"
        );
    }

    #[rstest]
    fn test_validate_non_finite_price(mut site: Model) {
        site.grid.sell_prices[2] = MoneyPerEnergy(f64::NAN);
        assert_error!(
            site.validate(),
            "The grid sell price series must contain only finite values"
        );
    }

    #[rstest]
    fn test_validate_non_finite_fuel_price(mut site: Model) {
        *site.fuel_prices.get_mut("gas").unwrap() = MoneyPerEnergy(f64::INFINITY);
        assert_error!(site.validate(), "Fuel gas has a non-finite price");
    }
}
