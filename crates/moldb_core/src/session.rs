//! The ambient session transaction and the molecule registry.

use crate::error::{StoreError, StoreResult};
use crate::store::{MoleculeStore, INFO_KEY};
use crate::types::MoleculeId;
use heed3::RwTxn;
use moldb_codec::{from_bytes, to_bytes, EnvInfo, MoleculeRecord, SCHEMA_VERSION};
use tracing::{debug, trace};

/// Postfix of a molecule's atom sub-database name.
pub(crate) const ATOM_DB_POSTFIX: &str = "_db_atom";
/// Postfix of a molecule's bond sub-database name.
pub(crate) const BOND_DB_POSTFIX: &str = "_db_bond";
/// Postfix appended to an entity sub-database name to form its staging
/// sub-database name.
pub(crate) const REMOVED_POSTFIX: &str = "_removed";

/// The ambient read-write transaction, shared by all logical operations
/// between [`MoleculeStore::begin`] and [`Self::commit`].
///
/// Every registry and entity operation lives on this context, so the
/// dependency on the open transaction is explicit rather than an implicit
/// store field. Operations observe all prior writes made through the same
/// context; nothing is visible to later sessions until `commit` succeeds.
///
/// Dropping the context discards its pending writes. After a failed
/// `commit` the context is dead and every operation returns
/// [`StoreError::NotReady`]; the caller must start over with
/// [`MoleculeStore::begin`] and re-derive its state.
pub struct MoleculeTxn<'store> {
    pub(crate) store: &'store MoleculeStore,
    /// The engine transaction. `None` once the context is dead.
    pub(crate) inner: Option<RwTxn<'store>>,
    /// In-memory molecule id counter, persisted into the info record on
    /// commit.
    next_molecule_id: u32,
}

impl<'store> MoleculeTxn<'store> {
    pub(crate) fn new(
        store: &'store MoleculeStore,
        txn: RwTxn<'store>,
        next_molecule_id: u32,
    ) -> Self {
        Self {
            store,
            inner: Some(txn),
            next_molecule_id,
        }
    }

    pub(crate) fn wtxn(&mut self) -> StoreResult<&mut RwTxn<'store>> {
        self.inner.as_mut().ok_or(StoreError::NotReady)
    }

    pub(crate) fn rtxn(&self) -> StoreResult<&RwTxn<'store>> {
        self.inner.as_ref().ok_or(StoreError::NotReady)
    }

    /// Commits the session and immediately opens a fresh transaction on
    /// this context, running the cleanup pass against it.
    ///
    /// The current info record (schema version and molecule id counter) is
    /// persisted as part of the commit. On any failure the pending writes
    /// are lost and the context becomes dead; the environment stays at its
    /// last committed state.
    pub fn commit(&mut self) -> StoreResult<()> {
        let mut txn = self.inner.take().ok_or(StoreError::NotReady)?;
        let info = EnvInfo {
            version: SCHEMA_VERSION,
            next_molecule_id: self.next_molecule_id,
        };
        self.store.info.put(&mut txn, &INFO_KEY, &to_bytes(&info)?)?;
        txn.commit()?;
        trace!(
            next_molecule_id = info.next_molecule_id,
            "committed session transaction"
        );

        // Fresh transaction for the next batch of operations; purge what
        // the committed one staged.
        self.inner = Some(self.store.env().write_txn()?);
        self.purge_staged()?;
        Ok(())
    }

    // ========================================================================
    // Molecule registry
    // ========================================================================

    /// Allocates a new empty molecule and returns its id.
    ///
    /// Takes the next value from the environment counter and writes a
    /// descriptor with zeroed atom/bond counters and deterministic
    /// sub-database names. An allocated id is never reissued, even if a
    /// downstream write in the same session fails.
    pub fn create_molecule(&mut self) -> StoreResult<MoleculeId> {
        let id = self.next_molecule_id;
        self.next_molecule_id = id + 1;

        let molecule = MoleculeId::new(id);
        let record = MoleculeRecord {
            atom_collection: format!("{id}{ATOM_DB_POSTFIX}"),
            bond_collection: format!("{id}{BOND_DB_POSTFIX}"),
            next_atom_id: 0,
            next_bond_id: 0,
        };
        self.put_molecule_record(molecule, &record)?;
        debug!(%molecule, "created molecule");
        Ok(molecule)
    }

    /// Returns whether a molecule with the given id exists.
    pub fn has_molecule(&self, molecule: MoleculeId) -> StoreResult<bool> {
        let txn = self.rtxn()?;
        Ok(self.store.registry.get(txn, &molecule.as_u32())?.is_some())
    }

    /// Lists all molecule ids, in the registry's physical storage order.
    pub fn molecules(&self) -> StoreResult<Vec<MoleculeId>> {
        let txn = self.rtxn()?;
        let mut out = Vec::new();
        for entry in self.store.registry.iter(txn)? {
            let (id, _) = entry?;
            out.push(MoleculeId::new(id));
        }
        Ok(out)
    }

    /// Destroys a molecule: empties its atom, bond and staging
    /// sub-databases, evicts the cached handles and removes the
    /// descriptor. Destruction is immediate, not staged, and has no undo.
    pub fn destroy_molecule(&mut self, molecule: MoleculeId) -> StoreResult<()> {
        let atoms = self.atoms_db(molecule)?;
        let bonds = self.bonds_db(molecule)?;
        let staged_atoms = self.staged_atoms_db(molecule)?;
        let staged_bonds = self.staged_bonds_db(molecule)?;

        let txn = self.inner.as_mut().ok_or(StoreError::NotReady)?;
        atoms.clear(txn)?;
        bonds.clear(txn)?;
        staged_atoms.clear(txn)?;
        staged_bonds.clear(txn)?;
        self.store.registry.delete(txn, &molecule.as_u32())?;

        self.store.handles.write().evict(molecule);
        debug!(%molecule, "destroyed molecule");
        Ok(())
    }

    // ========================================================================
    // Descriptor access
    // ========================================================================

    pub(crate) fn molecule_record(&self, molecule: MoleculeId) -> StoreResult<MoleculeRecord> {
        let txn = self.rtxn()?;
        let bytes = self
            .store
            .registry
            .get(txn, &molecule.as_u32())?
            .ok_or(StoreError::MoleculeNotFound(molecule))?;
        Ok(from_bytes(bytes)?)
    }

    pub(crate) fn put_molecule_record(
        &mut self,
        molecule: MoleculeId,
        record: &MoleculeRecord,
    ) -> StoreResult<()> {
        let registry = self.store.registry;
        let bytes = to_bytes(record)?;
        let txn = self.wtxn()?;
        registry.put(txn, &molecule.as_u32(), &bytes)?;
        Ok(())
    }
}

impl Drop for MoleculeTxn<'_> {
    fn drop(&mut self) {
        // Aborts the engine transaction if still open.
        self.inner.take();
        self.store.release_writer();
    }
}

impl std::fmt::Debug for MoleculeTxn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoleculeTxn")
            .field("alive", &self.inner.is_some())
            .field("next_molecule_id", &self.next_molecule_id)
            .finish()
    }
}
