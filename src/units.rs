//! Newtypes for the quantities used in the model.
//!
//! Wrapping every quantity keeps the arithmetic honest: a price times an energy is money, an
//! efficiency times an energy is an energy, and mixing families without an explicit operation is
//! a compile error. Raw `f64`s appear only at the solver and serialization boundaries.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Common behaviour for unit types
pub trait UnitType: Copy {
    /// Create a new quantity of this unit type
    fn new(value: f64) -> Self;

    /// The raw value of the quantity
    fn value(&self) -> f64;
}

/// Define a newtype wrapping `f64` with the standard arithmetic for one unit family
macro_rules! define_unit_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new quantity of this unit type
            pub fn new(value: f64) -> Self {
                Self(value)
            }

            /// The raw value of the quantity
            pub fn value(&self) -> f64 {
                self.0
            }

            /// Whether the value is neither infinite nor NaN
            pub fn is_finite(&self) -> bool {
                self.0.is_finite()
            }
        }

        impl UnitType for $name {
            fn new(value: f64) -> Self {
                Self(value)
            }

            fn value(&self) -> f64 {
                self.0
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$name> for f64 {
            type Output = $name;

            fn mul(self, rhs: $name) -> $name {
                $name(self * rhs.0)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;

            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|quantity| quantity.0).sum())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_unit_type! {
    /// An amount of energy moved within one period (kWh)
    Energy
}

define_unit_type! {
    /// An amount of money
    Money
}

define_unit_type! {
    /// A price or cost per unit of energy
    MoneyPerEnergy
}

define_unit_type! {
    /// A ratio of like quantities, such as an efficiency or a performance-map slope
    Dimensionless
}

/// Define the product of two different unit types, in both operand orders
macro_rules! define_unit_product {
    ($lhs:ty, $rhs:ty, $output:ty) => {
        impl Mul<$rhs> for $lhs {
            type Output = $output;

            fn mul(self, rhs: $rhs) -> $output {
                <$output>::new(self.value() * rhs.value())
            }
        }

        impl Mul<$lhs> for $rhs {
            type Output = $output;

            fn mul(self, rhs: $lhs) -> $output {
                <$output>::new(self.value() * rhs.value())
            }
        }
    };
}

define_unit_product!(MoneyPerEnergy, Energy, Money);
define_unit_product!(Dimensionless, Energy, Energy);

impl Div<Dimensionless> for Energy {
    type Output = Energy;

    fn div(self, rhs: Dimensionless) -> Energy {
        Energy(self.0 / rhs.0)
    }
}
