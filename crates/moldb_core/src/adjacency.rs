//! Endpoint bond-set maintenance.
//!
//! Each atom record carries the ids of the bonds attached to it. These
//! helpers keep that set in step with bond creation and staging via plain
//! read-modify-write on the atom record; they never touch removal markers.

use crate::error::StoreResult;
use crate::session::MoleculeTxn;
use crate::types::{AtomId, BondId, MoleculeId};

impl MoleculeTxn<'_> {
    /// Adds the bond to the atom's bond set. Idempotent: an already
    /// attached bond is not duplicated.
    pub(crate) fn attach_bond(
        &mut self,
        molecule: MoleculeId,
        atom: AtomId,
        bond: BondId,
    ) -> StoreResult<()> {
        let mut record = self.atom_record(molecule, atom)?;
        let raw = bond.as_u32();
        if !record.bonds.contains(&raw) {
            record.bonds.push(raw);
            self.put_atom_record(molecule, atom, &record)?;
        }
        Ok(())
    }

    /// Drops the bond from the atom's bond set. A bond that is not in the
    /// set is a no-op rather than an error; staging paths may race over the
    /// same endpoint within a cascade.
    pub(crate) fn detach_bond(
        &mut self,
        molecule: MoleculeId,
        atom: AtomId,
        bond: BondId,
    ) -> StoreResult<()> {
        let mut record = self.atom_record(molecule, atom)?;
        let raw = bond.as_u32();
        let before = record.bonds.len();
        record.bonds.retain(|b| *b != raw);
        if record.bonds.len() != before {
            self.put_atom_record(molecule, atom, &record)?;
        }
        Ok(())
    }
}
