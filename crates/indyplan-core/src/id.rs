use serde::{Deserialize, Serialize};

/// Identifies an item, blueprint, skill, rig or decryptor type in the
/// catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);
