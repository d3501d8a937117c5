//! Atom operations.

use crate::error::{StoreError, StoreResult};
use crate::session::MoleculeTxn;
use crate::types::{AtomId, AtomSnapshot, BondId, MoleculeId};
use moldb_codec::{from_bytes, to_bytes, AtomRecord, Vec3};
use std::collections::HashSet;

impl MoleculeTxn<'_> {
    /// Creates a new atom, drawing its id from the molecule's counter.
    ///
    /// The descriptor is written back with the advanced counter in the
    /// same logical step, so ids are never reissued.
    pub fn create_atom(
        &mut self,
        molecule: MoleculeId,
        element: u32,
        position: Vec3,
    ) -> StoreResult<AtomId> {
        let mut descriptor = self.molecule_record(molecule)?;
        let id = descriptor.next_atom_id;
        descriptor.next_atom_id = id + 1;
        self.put_molecule_record(molecule, &descriptor)?;

        let record = AtomRecord {
            element,
            position,
            bonds: Vec::new(),
        };
        let atom = AtomId::new(id);
        self.put_atom_record(molecule, atom, &record)?;
        Ok(atom)
    }

    /// Returns whether the atom exists and is not staged for removal.
    pub fn has_atom(&mut self, molecule: MoleculeId, atom: AtomId) -> StoreResult<bool> {
        if !self.has_molecule(molecule)? {
            return Ok(false);
        }
        if self.is_atom_removed(molecule, atom)? {
            return Ok(false);
        }
        let db = self.atoms_db(molecule)?;
        let txn = self.rtxn()?;
        Ok(db.get(txn, &atom.as_u32())?.is_some())
    }

    /// Reads an atom snapshot, or `None` if the atom is absent or staged
    /// for removal.
    ///
    /// Every bond id in the stored bond set is validated against the
    /// staging sub-database: a staged bond still referenced by the atom is
    /// an internal consistency bug and fails with
    /// [`StoreError::InvariantViolation`] rather than being silently
    /// pruned from the result.
    pub fn get_atom(
        &mut self,
        molecule: MoleculeId,
        atom: AtomId,
    ) -> StoreResult<Option<AtomSnapshot>> {
        if !self.has_atom(molecule, atom)? {
            return Ok(None);
        }
        let record = self.atom_record(molecule, atom)?;
        let mut bonds = Vec::with_capacity(record.bonds.len());
        for raw in record.bonds {
            let bond = BondId::new(raw);
            if self.is_bond_removed(molecule, bond)? {
                return Err(StoreError::invariant(format!(
                    "{atom} in {molecule} references staged {bond}"
                )));
            }
            bonds.push(bond);
        }
        Ok(Some(AtomSnapshot {
            element: record.element,
            position: record.position,
            bonds,
        }))
    }

    /// Overwrites the atom record unconditionally. Callers are expected to
    /// have checked existence.
    pub fn set_atom(
        &mut self,
        molecule: MoleculeId,
        atom: AtomId,
        snapshot: &AtomSnapshot,
    ) -> StoreResult<()> {
        let record = AtomRecord {
            element: snapshot.element,
            position: snapshot.position,
            bonds: snapshot.bonds.iter().map(|b| b.as_u32()).collect(),
        };
        self.put_atom_record(molecule, atom, &record)
    }

    /// Number of live atoms: total records minus staged ones, read from
    /// the engine's statistics rather than by scanning.
    pub fn atom_count(&mut self, molecule: MoleculeId) -> StoreResult<u64> {
        let db = self.atoms_db(molecule)?;
        let staged = self.staged_atoms_db(molecule)?;
        let txn = self.rtxn()?;
        Ok(db.len(txn)?.saturating_sub(staged.len(txn)?))
    }

    /// Lists all live atom ids, filtering out staged ones.
    pub fn atoms(&mut self, molecule: MoleculeId) -> StoreResult<Vec<AtomId>> {
        let db = self.atoms_db(molecule)?;
        let staged_db = self.staged_atoms_db(molecule)?;
        let txn = self.rtxn()?;

        let mut staged = HashSet::new();
        for entry in staged_db.iter(txn)? {
            staged.insert(entry?.0);
        }

        let mut out = Vec::new();
        for entry in db.iter(txn)? {
            let (id, _) = entry?;
            if !staged.contains(&id) {
                out.push(AtomId::new(id));
            }
        }
        Ok(out)
    }

    /// Stages the atom for removal and cascades to its bonds.
    ///
    /// The coordinator drives the cascade iteratively: every bond still in
    /// the atom's bond set that is not yet staged gets staged, which
    /// detaches it from both endpoints (including the other endpoint's
    /// stored bond set). Bond staging never recurses back into atoms, so
    /// the cascade depth is bounded at one level.
    pub fn mark_atom_removed(&mut self, molecule: MoleculeId, atom: AtomId) -> StoreResult<()> {
        let record = self.atom_record(molecule, atom)?;

        let staged = self.staged_atoms_db(molecule)?;
        let txn = self.wtxn()?;
        staged.put(txn, &atom.as_u32(), &[])?;

        for raw in record.bonds {
            let bond = BondId::new(raw);
            if !self.is_bond_removed(molecule, bond)? {
                self.stage_bond(molecule, bond)?;
            }
        }
        Ok(())
    }

    /// Returns whether the atom is staged for removal.
    pub fn is_atom_removed(&mut self, molecule: MoleculeId, atom: AtomId) -> StoreResult<bool> {
        let staged = self.staged_atoms_db(molecule)?;
        let txn = self.rtxn()?;
        Ok(staged.get(txn, &atom.as_u32())?.is_some())
    }

    /// Removes the atom's removal marker. Returns `false` if the atom was
    /// not staged.
    ///
    /// Bond markers staged by the removal cascade are deliberately left in
    /// place; restoring a bond is an explicit
    /// [`Self::unmark_bond_removed`] per bond.
    pub fn unmark_atom_removed(&mut self, molecule: MoleculeId, atom: AtomId) -> StoreResult<bool> {
        if !self.is_atom_removed(molecule, atom)? {
            return Ok(false);
        }
        let staged = self.staged_atoms_db(molecule)?;
        let txn = self.wtxn()?;
        staged.delete(txn, &atom.as_u32())?;
        Ok(true)
    }

    // ========================================================================
    // Record access
    // ========================================================================

    /// Direct record lookup, bypassing the staging filter.
    pub(crate) fn atom_record(
        &mut self,
        molecule: MoleculeId,
        atom: AtomId,
    ) -> StoreResult<AtomRecord> {
        let db = self.atoms_db(molecule)?;
        let txn = self.rtxn()?;
        let bytes = db
            .get(txn, &atom.as_u32())?
            .ok_or(StoreError::AtomNotFound { molecule, atom })?;
        Ok(from_bytes(bytes)?)
    }

    pub(crate) fn put_atom_record(
        &mut self,
        molecule: MoleculeId,
        atom: AtomId,
        record: &AtomRecord,
    ) -> StoreResult<()> {
        let db = self.atoms_db(molecule)?;
        let bytes = to_bytes(record)?;
        let txn = self.wtxn()?;
        db.put(txn, &atom.as_u32(), &bytes)?;
        Ok(())
    }

    /// Physically removes the atom record. Cleanup-pass internal: does not
    /// repair adjacency on its own.
    pub(crate) fn delete_atom(&mut self, molecule: MoleculeId, atom: AtomId) -> StoreResult<()> {
        let db = self.atoms_db(molecule)?;
        let txn = self.wtxn()?;
        db.delete(txn, &atom.as_u32())?;
        Ok(())
    }
}
