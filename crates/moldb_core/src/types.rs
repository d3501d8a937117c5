//! Core type definitions for the store.

use moldb_codec::Vec3;
use std::fmt;

/// Unique identifier for a molecule within one environment.
///
/// Molecule ids are allocated from the environment's counter, are
/// monotonically increasing and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MoleculeId(pub u32);

impl MoleculeId {
    /// Creates a new molecule ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mol:{}", self.0)
    }
}

/// Identifier for an atom, unique within its owning molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomId(pub u32);

impl AtomId {
    /// Creates a new atom ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom:{}", self.0)
    }
}

/// Identifier for a bond, unique within its owning molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BondId(pub u32);

impl BondId {
    /// Creates a new bond ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BondId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bond:{}", self.0)
    }
}

/// A decoded view of an atom, as returned by reads and accepted by updates.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomSnapshot {
    /// Element type (atomic number).
    pub element: u32,
    /// Position in 3-D space.
    pub position: Vec3,
    /// Bonds currently referencing this atom.
    pub bonds: Vec<BondId>,
}

/// A decoded view of a bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondSnapshot {
    /// First endpoint atom.
    pub first_atom: AtomId,
    /// Second endpoint atom.
    pub second_atom: AtomId,
    /// Bond order (1 = single, 2 = double, 3 = triple).
    pub order: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn molecule_id_ordering() {
        assert!(MoleculeId::new(1) < MoleculeId::new(2));
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", MoleculeId::new(7)), "mol:7");
        assert_eq!(format!("{}", AtomId::new(0)), "atom:0");
        assert_eq!(format!("{}", BondId::new(42)), "bond:42");
    }
}
