//! Typed identifiers for verglas entities.
//!
//! All long-lived entities are identified by typed string wrappers. These
//! ensure type safety and provide consistent serialization.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a scenario (one simulation request's subject).
    ScenarioId
);

string_id!(
    /// Unique identifier for a placed device within a scenario.
    DeviceId
);

string_id!(
    /// Unique identifier for a physical sensor producing observations.
    SensorId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trip() {
        let id: ScenarioId = "ramp-7.north".into();
        assert_eq!(id.to_string(), "ramp-7.north");
        assert_eq!(id.as_str(), "ramp-7.north");
    }
}
