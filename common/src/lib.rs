//! Support code shared by the armspec binaries

use {core::hash::BuildHasherDefault, twox_hash::XxHash64};

pub mod mask;
pub mod util;

pub type Hasher = XxHash64;

/// HashMap with non-default hasher
pub type HashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<Hasher>>;
