//! Typed identifiers
//!
//! Every persisted record is keyed by a random v4 UUID wrapped in its own
//! newtype, so a [`CellId`] can never be passed where a [`ColumnId`] is expected.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Table`](crate::Table)
    TableId
);
define_id!(
    /// Identifier of a [`Column`](crate::Column)
    ColumnId
);
define_id!(
    /// Identifier of a [`SelectOption`](crate::SelectOption)
    OptionId
);
define_id!(
    /// Identifier of a [`TableApi`](crate::TableApi)
    TableApiId
);
define_id!(
    /// Identifier of a [`Cell`](crate::Cell)
    CellId
);
define_id!(
    /// Identifier of a [`FormulaStep`](crate::FormulaStep)
    StepId
);
