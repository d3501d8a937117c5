//! Bond operations.

use crate::error::{StoreError, StoreResult};
use crate::session::MoleculeTxn;
use crate::types::{AtomId, BondId, BondSnapshot, MoleculeId};
use moldb_codec::{from_bytes, to_bytes, BondRecord};
use std::collections::HashSet;

impl MoleculeTxn<'_> {
    /// Creates a bond between two atoms and attaches it to both endpoint
    /// bond sets immediately.
    pub fn create_bond(
        &mut self,
        molecule: MoleculeId,
        first_atom: AtomId,
        second_atom: AtomId,
        order: u8,
    ) -> StoreResult<BondId> {
        let mut descriptor = self.molecule_record(molecule)?;
        let id = descriptor.next_bond_id;
        descriptor.next_bond_id = id + 1;
        self.put_molecule_record(molecule, &descriptor)?;

        let record = BondRecord {
            first_atom: first_atom.as_u32(),
            second_atom: second_atom.as_u32(),
            order,
        };
        let bond = BondId::new(id);
        self.put_bond_record(molecule, bond, &record)?;
        self.attach_bond(molecule, first_atom, bond)?;
        self.attach_bond(molecule, second_atom, bond)?;
        Ok(bond)
    }

    /// Returns whether the bond exists and is not staged for removal.
    pub fn has_bond(&mut self, molecule: MoleculeId, bond: BondId) -> StoreResult<bool> {
        if !self.has_molecule(molecule)? {
            return Ok(false);
        }
        if self.is_bond_removed(molecule, bond)? {
            return Ok(false);
        }
        let db = self.bonds_db(molecule)?;
        let txn = self.rtxn()?;
        Ok(db.get(txn, &bond.as_u32())?.is_some())
    }

    /// Reads a bond snapshot, or `None` if the bond is absent or staged
    /// for removal.
    pub fn get_bond(
        &mut self,
        molecule: MoleculeId,
        bond: BondId,
    ) -> StoreResult<Option<BondSnapshot>> {
        if !self.has_bond(molecule, bond)? {
            return Ok(None);
        }
        let record = self.bond_record(molecule, bond)?;
        Ok(Some(BondSnapshot {
            first_atom: AtomId::new(record.first_atom),
            second_atom: AtomId::new(record.second_atom),
            order: record.order,
        }))
    }

    /// Overwrites the bond record unconditionally. Endpoint bond sets are
    /// not rewritten; callers changing endpoints stage the old bond and
    /// create a new one instead.
    pub fn set_bond(
        &mut self,
        molecule: MoleculeId,
        bond: BondId,
        snapshot: &BondSnapshot,
    ) -> StoreResult<()> {
        let record = BondRecord {
            first_atom: snapshot.first_atom.as_u32(),
            second_atom: snapshot.second_atom.as_u32(),
            order: snapshot.order,
        };
        self.put_bond_record(molecule, bond, &record)
    }

    /// Number of live bonds: total records minus staged ones.
    pub fn bond_count(&mut self, molecule: MoleculeId) -> StoreResult<u64> {
        let db = self.bonds_db(molecule)?;
        let staged = self.staged_bonds_db(molecule)?;
        let txn = self.rtxn()?;
        Ok(db.len(txn)?.saturating_sub(staged.len(txn)?))
    }

    /// Lists all live bond ids, filtering out staged ones.
    pub fn bonds(&mut self, molecule: MoleculeId) -> StoreResult<Vec<BondId>> {
        let db = self.bonds_db(molecule)?;
        let staged_db = self.staged_bonds_db(molecule)?;
        let txn = self.rtxn()?;

        let mut staged = HashSet::new();
        for entry in staged_db.iter(txn)? {
            staged.insert(entry?.0);
        }

        let mut out = Vec::new();
        for entry in db.iter(txn)? {
            let (id, _) = entry?;
            if !staged.contains(&id) {
                out.push(BondId::new(id));
            }
        }
        Ok(out)
    }

    /// Stages the bond for removal, detaching it from both endpoints.
    pub fn mark_bond_removed(&mut self, molecule: MoleculeId, bond: BondId) -> StoreResult<()> {
        if !self.has_bond(molecule, bond)? {
            return Err(StoreError::BondNotFound { molecule, bond });
        }
        self.stage_bond(molecule, bond)
    }

    /// Returns whether the bond is staged for removal.
    pub fn is_bond_removed(&mut self, molecule: MoleculeId, bond: BondId) -> StoreResult<bool> {
        let staged = self.staged_bonds_db(molecule)?;
        let txn = self.rtxn()?;
        Ok(staged.get(txn, &bond.as_u32())?.is_some())
    }

    /// Removes the bond's removal marker and re-attaches it to both
    /// endpoints. Returns `false` if the bond was not staged.
    pub fn unmark_bond_removed(&mut self, molecule: MoleculeId, bond: BondId) -> StoreResult<bool> {
        if !self.is_bond_removed(molecule, bond)? {
            return Ok(false);
        }
        let staged = self.staged_bonds_db(molecule)?;
        let txn = self.wtxn()?;
        staged.delete(txn, &bond.as_u32())?;

        let record = self.bond_record(molecule, bond)?;
        self.attach_bond(molecule, AtomId::new(record.first_atom), bond)?;
        self.attach_bond(molecule, AtomId::new(record.second_atom), bond)?;
        Ok(true)
    }

    /// Writes the bond's removal marker and detaches it from both endpoint
    /// bond sets. Endpoint repair happens here, at staging time, so that
    /// reads never see a live atom pointing at a staged bond.
    pub(crate) fn stage_bond(&mut self, molecule: MoleculeId, bond: BondId) -> StoreResult<()> {
        let record = self.bond_record(molecule, bond)?;

        let staged = self.staged_bonds_db(molecule)?;
        let txn = self.wtxn()?;
        staged.put(txn, &bond.as_u32(), &[])?;

        self.detach_bond(molecule, AtomId::new(record.first_atom), bond)?;
        self.detach_bond(molecule, AtomId::new(record.second_atom), bond)?;
        Ok(())
    }

    // ========================================================================
    // Record access
    // ========================================================================

    /// Direct record lookup, bypassing the staging filter.
    pub(crate) fn bond_record(
        &mut self,
        molecule: MoleculeId,
        bond: BondId,
    ) -> StoreResult<BondRecord> {
        let db = self.bonds_db(molecule)?;
        let txn = self.rtxn()?;
        let bytes = db
            .get(txn, &bond.as_u32())?
            .ok_or(StoreError::BondNotFound { molecule, bond })?;
        Ok(from_bytes(bytes)?)
    }

    pub(crate) fn put_bond_record(
        &mut self,
        molecule: MoleculeId,
        bond: BondId,
        record: &BondRecord,
    ) -> StoreResult<()> {
        let db = self.bonds_db(molecule)?;
        let bytes = to_bytes(record)?;
        let txn = self.wtxn()?;
        db.put(txn, &bond.as_u32(), &bytes)?;
        Ok(())
    }

    /// Physically removes the bond record. Cleanup-pass internal.
    pub(crate) fn delete_bond(&mut self, molecule: MoleculeId, bond: BondId) -> StoreResult<()> {
        let db = self.bonds_db(molecule)?;
        let txn = self.wtxn()?;
        db.delete(txn, &bond.as_u32())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::open_store;
    use crate::{BondId, StoreError};
    use moldb_codec::Vec3;

    #[test]
    fn new_bond_appears_in_both_endpoints() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let b = txn.create_atom(mol, 1, Vec3::default()).unwrap();

        let bond = txn.create_bond(mol, a, b, 1).unwrap();

        let snapshot = txn.get_bond(mol, bond).unwrap().unwrap();
        assert_eq!(snapshot.first_atom, a);
        assert_eq!(snapshot.second_atom, b);
        assert_eq!(snapshot.order, 1);
        assert_eq!(txn.get_atom(mol, a).unwrap().unwrap().bonds, vec![bond]);
        assert_eq!(txn.get_atom(mol, b).unwrap().unwrap().bonds, vec![bond]);
    }

    #[test]
    fn marking_bond_detaches_both_endpoints() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let b = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        let bond = txn.create_bond(mol, a, b, 1).unwrap();

        txn.mark_bond_removed(mol, bond).unwrap();

        assert!(txn.is_bond_removed(mol, bond).unwrap());
        assert!(!txn.has_bond(mol, bond).unwrap());
        assert!(txn.get_bond(mol, bond).unwrap().is_none());
        assert!(txn.get_atom(mol, a).unwrap().unwrap().bonds.is_empty());
        assert!(txn.get_atom(mol, b).unwrap().unwrap().bonds.is_empty());
    }

    #[test]
    fn unmarking_bond_reattaches_both_endpoints() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let b = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        let bond = txn.create_bond(mol, a, b, 2).unwrap();

        txn.mark_bond_removed(mol, bond).unwrap();
        assert!(txn.unmark_bond_removed(mol, bond).unwrap());

        assert!(txn.has_bond(mol, bond).unwrap());
        assert_eq!(txn.get_atom(mol, a).unwrap().unwrap().bonds, vec![bond]);
        assert_eq!(txn.get_atom(mol, b).unwrap().unwrap().bonds, vec![bond]);
        assert!(!txn.unmark_bond_removed(mol, bond).unwrap());
    }

    #[test]
    fn marking_missing_bond_fails() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        assert!(matches!(
            txn.mark_bond_removed(mol, BondId::new(9)),
            Err(StoreError::BondNotFound { .. })
        ));
    }

    #[test]
    fn bond_count_excludes_staged() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let b = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        let c = txn.create_atom(mol, 1, Vec3::default()).unwrap();

        let ab = txn.create_bond(mol, a, b, 1).unwrap();
        let ac = txn.create_bond(mol, a, c, 1).unwrap();
        assert_eq!(txn.bond_count(mol).unwrap(), 2);

        txn.mark_bond_removed(mol, ab).unwrap();
        assert_eq!(txn.bond_count(mol).unwrap(), 1);
        assert_eq!(txn.bonds(mol).unwrap(), vec![ac]);
    }

    #[test]
    fn marking_atom_cascades_to_unmarked_bonds() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let b = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        let c = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        let ab = txn.create_bond(mol, a, b, 1).unwrap();
        let ac = txn.create_bond(mol, a, c, 1).unwrap();

        txn.mark_atom_removed(mol, a).unwrap();

        assert!(txn.is_atom_removed(mol, a).unwrap());
        assert!(txn.is_bond_removed(mol, ab).unwrap());
        assert!(txn.is_bond_removed(mol, ac).unwrap());
        // Neighbours survive with their bond sets repaired.
        assert!(txn.has_atom(mol, b).unwrap());
        assert!(txn.get_atom(mol, b).unwrap().unwrap().bonds.is_empty());
        assert!(txn.get_atom(mol, c).unwrap().unwrap().bonds.is_empty());
    }

    #[test]
    fn unmarking_atom_leaves_cascaded_bonds_staged() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let b = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        let ab = txn.create_bond(mol, a, b, 1).unwrap();

        txn.mark_atom_removed(mol, a).unwrap();
        assert!(txn.unmark_atom_removed(mol, a).unwrap());

        // The atom comes back, its cascaded bond does not.
        assert!(txn.has_atom(mol, a).unwrap());
        assert!(txn.is_bond_removed(mol, ab).unwrap());
        assert!(txn.get_atom(mol, a).unwrap().unwrap().bonds.is_empty());
    }
}
