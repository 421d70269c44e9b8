//! Storage devices attached to the site's energy balances.
use crate::id::StorageID;
use crate::units::{Dimensionless, Energy};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use std::rc::Rc;

/// A map of storage devices, keyed by id
pub type StorageMap = IndexMap<StorageID, Rc<StorageDevice>>;

/// The carrier a storage device holds and the losses it incurs.
///
/// Thermal stores lose a fraction of their level each period to standing dissipation. Electrical
/// stores lose on conversion instead: only part of the energy charged arrives in the store and
/// discharging draws down more than is delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StorageKind {
    /// A heat store on the thermal balance
    Thermal {
        /// Fraction of the stored energy retained from one period to the next
        dissipation_efficiency: Dimensionless,
    },
    /// A battery on the electrical balance
    Electrical {
        /// Fraction of the charged energy that arrives in the store
        charge_efficiency: Dimensionless,
        /// Fraction of the drawn-down energy that is delivered
        discharge_efficiency: Dimensionless,
    },
}

/// An energy storage device
#[derive(Debug, Clone, PartialEq)]
pub struct StorageDevice {
    /// A unique identifier for the device
    pub id: StorageID,
    /// The carrier held and the device's loss model
    pub kind: StorageKind,
    /// Upper bound on the stored energy and on the flow per period.
    ///
    /// A zero-capacity device stays in the problem but is pinned to zero level and zero flow in
    /// every feasible solution.
    pub capacity: Energy,
}

impl StorageDevice {
    /// Whether the device sits on the electrical balance
    pub fn is_electrical(&self) -> bool {
        matches!(self.kind, StorageKind::Electrical { .. })
    }

    /// Whether the device sits on the thermal balance
    pub fn is_thermal(&self) -> bool {
        matches!(self.kind, StorageKind::Thermal { .. })
    }

    /// Check that the device's parameters are coherent
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.capacity.is_finite() && self.capacity >= Energy(0.0),
            "capacity must be finite and non-negative"
        );

        match self.kind {
            StorageKind::Thermal { dissipation_efficiency } => {
                check_efficiency(dissipation_efficiency, "dissipation_efficiency")?;
            }
            StorageKind::Electrical { charge_efficiency, discharge_efficiency } => {
                check_efficiency(charge_efficiency, "charge_efficiency")?;
                check_efficiency(discharge_efficiency, "discharge_efficiency")?;
            }
        }

        Ok(())
    }
}

/// Check that an efficiency lies in the interval (0, 1]
fn check_efficiency(value: Dimensionless, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value > Dimensionless(0.0) && value <= Dimensionless(1.0),
        "{name} must be in the interval (0, 1]"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, battery, heat_store};
    use rstest::rstest;

    #[rstest]
    fn test_validate_valid(heat_store: StorageDevice, battery: StorageDevice) {
        heat_store.validate().unwrap();
        battery.validate().unwrap();
    }

    #[rstest]
    fn test_validate_bad_capacity(mut battery: StorageDevice) {
        battery.capacity = Energy(-1.0);
        assert_error!(battery.validate(), "capacity must be finite and non-negative");
    }

    #[rstest]
    #[case(Dimensionless(0.0))]
    #[case(Dimensionless(1.1))]
    #[case(Dimensionless(f64::NAN))]
    fn test_validate_bad_dissipation(mut heat_store: StorageDevice, #[case] value: Dimensionless) {
        heat_store.kind = StorageKind::Thermal { dissipation_efficiency: value };
        assert_error!(
            heat_store.validate(),
            "dissipation_efficiency must be in the interval (0, 1]"
        );
    }

    #[rstest]
    fn test_validate_bad_charge_efficiency(mut battery: StorageDevice) {
        battery.kind = StorageKind::Electrical {
            charge_efficiency: Dimensionless(0.0),
            discharge_efficiency: Dimensionless(0.97),
        };
        assert_error!(battery.validate(), "charge_efficiency must be in the interval (0, 1]");
    }

    #[rstest]
    fn test_kind_predicates(heat_store: StorageDevice, battery: StorageDevice) {
        assert!(heat_store.is_thermal());
        assert!(!heat_store.is_electrical());
        assert!(battery.is_electrical());
        assert!(!battery.is_thermal());
    }
}
