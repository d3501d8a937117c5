//! Memoized sub-database handles.
//!
//! Entity operations resolve their molecule's sub-databases by name, which
//! costs a registry read and an engine open call. Handles are plain
//! integers valid for the life of the environment, so they are cached per
//! molecule id and evicted only when the molecule is destroyed.

use crate::error::{StoreError, StoreResult};
use crate::session::{MoleculeTxn, REMOVED_POSTFIX};
use crate::store::IdDb;
use crate::types::MoleculeId;
use heed3::byteorder::BE;
use heed3::types::{Bytes, U32};
use moldb_codec::MoleculeRecord;
use std::collections::HashMap;

/// Which of a molecule's four sub-databases is being addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DbKind {
    /// Atom records.
    Atoms,
    /// Bond records.
    Bonds,
    /// Removal markers for atoms.
    StagedAtoms,
    /// Removal markers for bonds.
    StagedBonds,
}

impl DbKind {
    fn database_name(self, descriptor: &MoleculeRecord) -> String {
        match self {
            Self::Atoms => descriptor.atom_collection.clone(),
            Self::Bonds => descriptor.bond_collection.clone(),
            Self::StagedAtoms => format!("{}{}", descriptor.atom_collection, REMOVED_POSTFIX),
            Self::StagedBonds => format!("{}{}", descriptor.bond_collection, REMOVED_POSTFIX),
        }
    }
}

/// Per-molecule handle arena, lazily populated on first use.
#[derive(Debug, Default)]
pub(crate) struct HandleCache {
    atoms: HashMap<MoleculeId, IdDb>,
    bonds: HashMap<MoleculeId, IdDb>,
    staged_atoms: HashMap<MoleculeId, IdDb>,
    staged_bonds: HashMap<MoleculeId, IdDb>,
}

impl HandleCache {
    fn map(&self, kind: DbKind) -> &HashMap<MoleculeId, IdDb> {
        match kind {
            DbKind::Atoms => &self.atoms,
            DbKind::Bonds => &self.bonds,
            DbKind::StagedAtoms => &self.staged_atoms,
            DbKind::StagedBonds => &self.staged_bonds,
        }
    }

    fn map_mut(&mut self, kind: DbKind) -> &mut HashMap<MoleculeId, IdDb> {
        match kind {
            DbKind::Atoms => &mut self.atoms,
            DbKind::Bonds => &mut self.bonds,
            DbKind::StagedAtoms => &mut self.staged_atoms,
            DbKind::StagedBonds => &mut self.staged_bonds,
        }
    }

    pub(crate) fn get(&self, kind: DbKind, molecule: MoleculeId) -> Option<IdDb> {
        self.map(kind).get(&molecule).copied()
    }

    pub(crate) fn insert(&mut self, kind: DbKind, molecule: MoleculeId, db: IdDb) {
        self.map_mut(kind).insert(molecule, db);
    }

    /// Drops every cached handle for the molecule. Called on destroy so a
    /// later molecule cannot observe stale handles.
    pub(crate) fn evict(&mut self, molecule: MoleculeId) {
        self.atoms.remove(&molecule);
        self.bonds.remove(&molecule);
        self.staged_atoms.remove(&molecule);
        self.staged_bonds.remove(&molecule);
    }
}

impl<'store> MoleculeTxn<'store> {
    pub(crate) fn atoms_db(&mut self, molecule: MoleculeId) -> StoreResult<IdDb> {
        self.entity_db(molecule, DbKind::Atoms)
    }

    pub(crate) fn bonds_db(&mut self, molecule: MoleculeId) -> StoreResult<IdDb> {
        self.entity_db(molecule, DbKind::Bonds)
    }

    pub(crate) fn staged_atoms_db(&mut self, molecule: MoleculeId) -> StoreResult<IdDb> {
        self.entity_db(molecule, DbKind::StagedAtoms)
    }

    pub(crate) fn staged_bonds_db(&mut self, molecule: MoleculeId) -> StoreResult<IdDb> {
        self.entity_db(molecule, DbKind::StagedBonds)
    }

    /// Resolves a sub-database handle, opening (and creating on first use)
    /// the named database if it is not cached yet.
    fn entity_db(&mut self, molecule: MoleculeId, kind: DbKind) -> StoreResult<IdDb> {
        if let Some(db) = self.store.handles.read().get(kind, molecule) {
            return Ok(db);
        }
        let descriptor = self.molecule_record(molecule)?;
        let name = kind.database_name(&descriptor);
        let txn = self.inner.as_mut().ok_or(StoreError::NotReady)?;
        let db = self
            .store
            .env()
            .create_database::<U32<BE>, Bytes>(txn, Some(&name))?;
        self.store.handles.write().insert(kind, molecule, db);
        Ok(db)
    }
}
