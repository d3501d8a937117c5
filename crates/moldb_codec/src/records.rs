//! Fixed-schema record types persisted by the store.
//!
//! Each record is encoded as a CBOR map keyed by field name. Every field
//! carries `#[serde(default)]` so a record written by an older schema
//! revision (missing trailing fields) still decodes, and unknown fields
//! from a newer revision are skipped. Compatibility is by field presence,
//! not by position.

use serde::{Deserialize, Serialize};

/// Current schema version written into [`EnvInfo`].
pub const SCHEMA_VERSION: u32 = 1;

/// A position in 3-D space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    #[serde(default)]
    pub x: f32,
    /// Y component.
    #[serde(default)]
    pub y: f32,
    /// Z component.
    #[serde(default)]
    pub z: f32,
}

impl Vec3 {
    /// Creates a new vector from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Singleton environment descriptor.
///
/// One instance exists per environment. It is seeded on first
/// initialization and rewritten on every commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvInfo {
    /// Schema version of the environment.
    #[serde(default)]
    pub version: u32,
    /// Next molecule id to allocate. Monotonically non-decreasing.
    #[serde(default)]
    pub next_molecule_id: u32,
}

impl EnvInfo {
    /// Creates a fresh descriptor for a newly initialized environment.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            version: SCHEMA_VERSION,
            next_molecule_id: 0,
        }
    }
}

/// Per-molecule descriptor stored in the molecule registry.
///
/// Holds the names of the molecule's entity sub-databases and the id
/// counters those sub-databases draw from. The counters are the sole
/// source of new atom/bond ids for the molecule and never move backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoleculeRecord {
    /// Name of the sub-database holding this molecule's atoms.
    #[serde(default)]
    pub atom_collection: String,
    /// Name of the sub-database holding this molecule's bonds.
    #[serde(default)]
    pub bond_collection: String,
    /// Next atom id to allocate.
    #[serde(default)]
    pub next_atom_id: u32,
    /// Next bond id to allocate.
    #[serde(default)]
    pub next_bond_id: u32,
}

/// A stored atom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    /// Element type (atomic number, e.g. hydrogen = 1, carbon = 6).
    #[serde(default)]
    pub element: u32,
    /// Position in 3-D space.
    #[serde(default)]
    pub position: Vec3,
    /// Ids of the bonds referencing this atom.
    ///
    /// Kept consistent synchronously by the store whenever a bond is
    /// created, staged for removal, or unstaged.
    #[serde(default)]
    pub bonds: Vec<u32>,
}

/// A stored bond between two atoms of the same molecule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondRecord {
    /// Id of the first endpoint atom.
    #[serde(default)]
    pub first_atom: u32,
    /// Id of the second endpoint atom.
    #[serde(default)]
    pub second_atom: u32,
    /// Bond order (1 = single, 2 = double, 3 = triple).
    #[serde(default)]
    pub order: u8,
}
