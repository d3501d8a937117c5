//! Deferred physical removal of staged records.
//!
//! Removal operations only write markers into per-molecule staging
//! sub-databases; the cleanup pass is what actually deletes the backing
//! records. It runs at the start of every fresh transaction and again
//! right after a successful commit, so a durable store never carries
//! markers across sessions for long.

use crate::error::StoreResult;
use crate::session::MoleculeTxn;
use crate::types::{AtomId, BondId};
use tracing::debug;

impl MoleculeTxn<'_> {
    /// Walks every registered molecule and physically deletes all records
    /// that carry a removal marker, then clears the staging sub-databases.
    ///
    /// Counters are never rewound, so ids of purged records are not
    /// reissued.
    pub(crate) fn purge_staged(&mut self) -> StoreResult<()> {
        let molecules = self.molecules()?;
        let mut purged_atoms = 0u64;
        let mut purged_bonds = 0u64;

        for molecule in molecules {
            let staged_atoms = self.staged_atoms_db(molecule)?;
            let staged_bonds = self.staged_bonds_db(molecule)?;

            let mut atoms = Vec::new();
            let mut bonds = Vec::new();
            {
                let txn = self.rtxn()?;
                for entry in staged_atoms.iter(txn)? {
                    atoms.push(AtomId::new(entry?.0));
                }
                for entry in staged_bonds.iter(txn)? {
                    bonds.push(BondId::new(entry?.0));
                }
            }
            if atoms.is_empty() && bonds.is_empty() {
                continue;
            }

            for atom in atoms {
                self.delete_atom(molecule, atom)?;
                purged_atoms += 1;
            }
            for bond in bonds {
                self.delete_bond(molecule, bond)?;
                purged_bonds += 1;
            }

            let txn = self.wtxn()?;
            staged_atoms.clear(txn)?;
            staged_bonds.clear(txn)?;
        }

        if purged_atoms > 0 || purged_bonds > 0 {
            debug!(purged_atoms, purged_bonds, "purged staged records");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::open_store;
    use crate::{MoleculeStore, StoreError};
    use moldb_codec::Vec3;

    #[test]
    fn commit_purges_staged_records() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let b = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        let bond = txn.create_bond(mol, a, b, 1).unwrap();

        txn.mark_atom_removed(mol, a).unwrap();
        txn.commit().unwrap();

        // Markers are gone and so are the backing records.
        assert!(!txn.is_atom_removed(mol, a).unwrap());
        assert!(!txn.is_bond_removed(mol, bond).unwrap());
        assert!(matches!(
            txn.atom_record(mol, a),
            Err(StoreError::AtomNotFound { .. })
        ));
        assert!(matches!(
            txn.bond_record(mol, bond),
            Err(StoreError::BondNotFound { .. })
        ));
        assert!(txn.has_atom(mol, b).unwrap());
        assert_eq!(txn.atom_count(mol).unwrap(), 1);
    }

    #[test]
    fn purged_record_cannot_be_unmarked() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();

        txn.mark_atom_removed(mol, a).unwrap();
        txn.commit().unwrap();

        assert!(!txn.unmark_atom_removed(mol, a).unwrap());
        assert!(!txn.has_atom(mol, a).unwrap());
    }

    #[test]
    fn ids_are_not_reused_after_purge() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        let a = txn.create_atom(mol, 6, Vec3::default()).unwrap();

        txn.mark_atom_removed(mol, a).unwrap();
        txn.commit().unwrap();

        let next = txn.create_atom(mol, 1, Vec3::default()).unwrap();
        assert!(next.as_u32() > a.as_u32());
    }

    #[test]
    fn fresh_transaction_purges_leftover_markers() {
        let dir = tempfile::tempdir().unwrap();
        let mol;
        let atom;
        {
            let store = MoleculeStore::open(dir.path()).unwrap();
            let mut txn = store.begin().unwrap();
            mol = txn.create_molecule().unwrap();
            atom = txn.create_atom(mol, 6, Vec3::default()).unwrap();
            txn.commit().unwrap();
            // Stage after the commit so the marker itself gets committed
            // without an intervening purge.
            txn.mark_atom_removed(mol, atom).unwrap();
            txn.commit().unwrap();
        }

        let store = MoleculeStore::open(dir.path()).unwrap();
        let mut txn = store.begin().unwrap();
        assert!(!txn.is_atom_removed(mol, atom).unwrap());
        assert!(matches!(
            txn.atom_record(mol, atom),
            Err(StoreError::AtomNotFound { .. })
        ));
    }

    #[test]
    fn end_to_end_lifecycle() {
        let (_dir, store) = open_store();
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();

        // Methane-ish: one centre, four neighbours.
        let c = txn.create_atom(mol, 6, Vec3::default()).unwrap();
        let mut hydrogens = Vec::new();
        for i in 0..4 {
            let h = txn
                .create_atom(mol, 1, Vec3::new(i as f32, 0.0, 0.0))
                .unwrap();
            txn.create_bond(mol, c, h, 1).unwrap();
            hydrogens.push(h);
        }
        assert_eq!(txn.atom_count(mol).unwrap(), 5);
        assert_eq!(txn.bond_count(mol).unwrap(), 4);
        assert_eq!(txn.get_atom(mol, c).unwrap().unwrap().bonds.len(), 4);

        txn.mark_atom_removed(mol, c).unwrap();
        assert_eq!(txn.atom_count(mol).unwrap(), 4);
        assert_eq!(txn.bond_count(mol).unwrap(), 0);

        txn.commit().unwrap();
        assert_eq!(txn.atom_count(mol).unwrap(), 4);
        for h in hydrogens {
            assert!(txn.get_atom(mol, h).unwrap().unwrap().bonds.is_empty());
        }
    }
}
