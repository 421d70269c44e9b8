//! Identifiers for model entities.
//!
//! Ids wrap a reference-counted string so they can be shared between the entity maps, the
//! variable maps and the projected schedules without copying the text.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Define a string id type backed by `Rc<str>`
macro_rules! define_id_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Rc<str>);

        impl $name {
            /// Create a new id from a string
            pub fn new(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id.as_str().into())
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let id = String::deserialize(deserializer)?;
                Ok(id.into())
            }
        }
    };
}

define_id_type! {
    /// Identifies a dispatchable unit
    UnitID
}

define_id_type! {
    /// Identifies a storage device
    StorageID
}

define_id_type! {
    /// Identifies a fuel with a configured price
    FuelID
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_equality_and_lookup() {
        let id = UnitID::new("engine");
        assert_eq!(id, "engine".into());
        assert_eq!(id.to_string(), "engine");

        let ids: HashSet<UnitID> = [id].into_iter().collect();
        assert!(ids.contains("engine"));
        assert!(!ids.contains("boiler"));
    }
}
