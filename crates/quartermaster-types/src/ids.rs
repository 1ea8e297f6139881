//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Agents, items, zones, and item kinds each get a distinct newtype so the
//! compiler rejects accidental mixing. All IDs use UUID v7 (time-ordered),
//! which keeps `BTreeMap` iteration roughly in creation order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
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

            /// Stable 64-bit digest of the identifier.
            ///
            /// Identical for the same id across runs, so it can seed
            /// per-entity offsets without any stored state.
            pub fn stable_hash(self) -> u64 {
                let (hi, lo) = self.0.as_u64_pair();
                mix64(hi ^ lo.rotate_left(32))
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

/// SplitMix64 finalizer.
const fn mix64(mut h: u64) -> u64 {
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}

define_id! {
    /// Unique identifier for an agent in the host simulation.
    AgentId
}

define_id! {
    /// Unique identifier for an item instance in the world.
    ItemId
}

define_id! {
    /// Unique identifier for a zone (independent simulated area).
    ZoneId
}

define_id! {
    /// Unique identifier for an item definition (the "kind" an equipment
    /// policy allows or forbids).
    ItemKindId
}
