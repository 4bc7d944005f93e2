//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every player and every unique game object carries a strongly-typed ID so
//! an egg GUID can never be passed where a unit GUID is expected. All IDs
//! use UUID v7 (time-ordered) so storage keys sort by creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a player (the persistence key).
    PlayerId
}

define_id! {
    /// GUID of an egg held in inventory or embedded in an incubator.
    EggId
}

define_id! {
    /// GUID of a hatched unit held in inventory or embedded in a pen.
    UnitId
}

define_id! {
    /// Identifier of a placed structure (incubator or pen).
    StructureId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let egg = EggId::new();
        let unit = UnitId::new();
        assert_ne!(egg.into_inner(), Uuid::nil());
        assert_ne!(unit.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_serializes_as_bare_uuid_string() {
        let id = PlayerId::new();
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json, Some(format!("\"{}\"", id.into_inner())));
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = StructureId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
