//! Physics layers: which colliders a raycast may hit.
//!
//! Colliders belong to a set of layers and every raycast carries the set of
//! layers that block it; a collider is considered when the two sets share a bit.

use num_traits::{One, PrimInt};
use serde::{Deserialize, Serialize};

/// A named bit of a layer mask. Implemented by [`define_bitmask_flags!`] enums.
pub trait FlagBitmask {
    type Storage: PrimInt;

    /// Must be below the bit width of `Storage`.
    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// Set of layers stored as raw bits; serializes as the bare integer.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitmaskFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> BitmaskFlags<T> {
    pub fn new(bits: T) -> Self {
        Self { bits }
    }

    /// Every layer, including ones not named by any enum.
    pub fn all() -> Self {
        Self { bits: !T::zero() }
    }

    pub fn add<U: FlagBitmask<Storage = T>>(&mut self, layer: U) {
        self.bits = self.bits | layer.mask();
    }

    pub fn remove<U: FlagBitmask<Storage = T>>(&mut self, layer: U) {
        self.bits = self.bits & !layer.mask();
    }

    pub fn has<U: FlagBitmask<Storage = T>>(&self, layer: U) -> bool {
        (self.bits & layer.mask()) != T::zero()
    }

    /// True if any bit is shared with `other`.
    pub fn intersects(&self, other: Self) -> bool {
        (self.bits & other.bits) != T::zero()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == T::zero()
    }
}

/// Declare a layer enum whose discriminants are bit indices.
///
/// ```rust
/// collision::define_bitmask_flags!(GameLayer, u32, {
///     Terrain,
///     Water,
/// });
/// ```
#[macro_export]
macro_rules! define_bitmask_flags {
    ($name:ident, $storage:ty, { $($variant:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::layer_flags::FlagBitmask for $name {
            type Storage = $storage;

            fn bit_index(&self) -> u8 {
                *self as u8
            }
        }
    };
}

define_bitmask_flags!(PhysicsLayer, u32, {
    Default,
    Floor,
    Wall,
    Ceiling,
    Props,
    Player,
    Teleport,
    Trigger,
});

/// Layer mask used by raycasts (blocking layers) and by colliders (membership).
pub type PhysicsLayerFlags = BitmaskFlags<u32>;

impl PhysicsLayerFlags {
    pub fn from_layers(layers: &[PhysicsLayer]) -> Self {
        let mut flags = Self::default();
        for &layer in layers {
            flags.add(layer);
        }
        flags
    }
}
