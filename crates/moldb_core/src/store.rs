//! Environment handle and session entry points.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::handles::HandleCache;
use crate::session::MoleculeTxn;
use heed3::byteorder::BE;
use heed3::types::{Bytes, U32};
use heed3::{Database, Env, EnvOpenOptions};
use moldb_codec::{from_bytes, to_bytes, EnvInfo};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Integer-keyed sub-database holding encoded records or markers.
pub(crate) type IdDb = Database<U32<BE>, Bytes>;
/// The unnamed default database, used by the key/value pass-through.
pub(crate) type RawDb = Database<Bytes, Bytes>;

/// Name of the environment info sub-database.
const INFO_DB: &str = "db_info";
/// Name of the molecule registry sub-database.
const REGISTRY_DB: &str = "db_molecule";
/// Key of the singleton [`EnvInfo`] record inside [`INFO_DB`].
pub(crate) const INFO_KEY: u32 = 3;

/// The store environment.
///
/// `MoleculeStore` owns the on-disk environment and hands out the single
/// ambient read-write transaction as an explicit [`MoleculeTxn`] context.
/// All molecule, atom and bond operations live on that context; nothing
/// is visible to a later session until the context commits.
///
/// One store instance assumes single-threaded access: the engine has a
/// single concurrent writer and a second `begin()` is rejected with
/// [`StoreError::TransactionActive`] rather than blocked.
///
/// ```rust,ignore
/// let store = MoleculeStore::open(Path::new("molecules"))?;
/// let mut txn = store.begin()?;
/// let mol = txn.create_molecule()?;
/// let a = txn.create_atom(mol, 6, Vec3::new(0.0, 0.0, 0.0))?;
/// txn.commit()?;
/// ```
pub struct MoleculeStore {
    /// The engine environment.
    env: Env,
    /// Singleton environment info.
    pub(crate) info: IdDb,
    /// Molecule registry: id -> descriptor.
    pub(crate) registry: IdDb,
    /// Unnamed default database for the key/value pass-through.
    defaults: RawDb,
    /// Memoized per-molecule sub-database handles.
    pub(crate) handles: RwLock<HandleCache>,
    /// Whether a session transaction is currently open.
    writer_active: AtomicBool,
}

impl MoleculeStore {
    /// Opens (creating if absent) the environment at the given directory.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Opens the environment with custom configuration.
    ///
    /// Opens or creates the info and registry sub-databases and seeds the
    /// [`EnvInfo`] record if missing. Any failure propagates the engine's
    /// diagnostic; partially opened handles are released on drop.
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref();
        if config.create_if_missing {
            fs::create_dir_all(path)?;
        }
        let env = Self::open_env(path, &config)?;

        let mut wtxn = env.write_txn()?;
        let info = env.create_database::<U32<BE>, Bytes>(&mut wtxn, Some(INFO_DB))?;
        let registry = env.create_database::<U32<BE>, Bytes>(&mut wtxn, Some(REGISTRY_DB))?;
        let defaults = env.create_database::<Bytes, Bytes>(&mut wtxn, None)?;
        if info.get(&wtxn, &INFO_KEY)?.is_none() {
            info.put(&mut wtxn, &INFO_KEY, &to_bytes(&EnvInfo::initial())?)?;
        }
        wtxn.commit()?;

        debug!(path = %path.display(), "opened store environment");
        Ok(Self {
            env,
            info,
            registry,
            defaults,
            handles: RwLock::new(HandleCache::default()),
            writer_active: AtomicBool::new(false),
        })
    }

    // The map must not be opened twice within one process; the store owns
    // its environment exclusively, which upholds heed's open contract.
    #[allow(unsafe_code)]
    fn open_env(path: &Path, config: &StoreConfig) -> StoreResult<Env> {
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size)
                .max_dbs(config.max_collections)
                .max_readers(config.max_readers)
                .open(path)?
        };
        Ok(env)
    }

    /// Begins the ambient session transaction.
    ///
    /// Loads the molecule id counter from the info record and runs the
    /// cleanup pass, physically purging everything staged for removal by
    /// the previous session before any new operation observes the store.
    pub fn begin(&self) -> StoreResult<MoleculeTxn<'_>> {
        self.acquire_writer()?;
        match self.begin_inner() {
            Ok(txn) => Ok(txn),
            Err(e) => {
                // begin_inner may fail before the context (whose drop
                // releases the writer) exists
                self.release_writer();
                Err(e)
            }
        }
    }

    fn begin_inner(&self) -> StoreResult<MoleculeTxn<'_>> {
        let wtxn = self.env.write_txn()?;
        let info: EnvInfo = from_bytes(
            self.info
                .get(&wtxn, &INFO_KEY)?
                .ok_or_else(|| StoreError::invariant("environment info record missing"))?,
        )?;
        let mut txn = MoleculeTxn::new(self, wtxn, info.next_molecule_id);
        txn.purge_staged()?;
        Ok(txn)
    }

    /// Returns whether a session transaction is currently open.
    #[must_use]
    pub fn session_active(&self) -> bool {
        self.writer_active.load(Ordering::Acquire)
    }

    pub(crate) fn acquire_writer(&self) -> StoreResult<()> {
        self.writer_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StoreError::TransactionActive)?;
        Ok(())
    }

    pub(crate) fn release_writer(&self) {
        self.writer_active.store(false, Ordering::Release);
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    // ========================================================================
    // Generic key/value pass-through
    // ========================================================================

    /// Stores an arbitrary key/value pair in the default database.
    ///
    /// Runs in its own short-lived write transaction, independent of the
    /// session transaction. Rejected with [`StoreError::TransactionActive`]
    /// while a session is open, since the engine's single writer slot is
    /// taken and waiting for it would deadlock the caller.
    pub fn put_value<K: Serialize, V: Serialize>(&self, key: &K, value: &V) -> StoreResult<()> {
        if self.session_active() {
            return Err(StoreError::TransactionActive);
        }
        let key_bytes = to_bytes(key)?;
        let value_bytes = to_bytes(value)?;
        let mut wtxn = self.env.write_txn()?;
        self.defaults.put(&mut wtxn, &key_bytes, &value_bytes)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Retrieves a value stored via [`Self::put_value`], or the default if
    /// the key is absent.
    pub fn get_value<K: Serialize, V: DeserializeOwned>(
        &self,
        key: &K,
        default: V,
    ) -> StoreResult<V> {
        let key_bytes = to_bytes(key)?;
        let rtxn = self.env.read_txn()?;
        match self.defaults.get(&rtxn, &key_bytes)? {
            Some(bytes) => Ok(from_bytes(bytes)?),
            None => Ok(default),
        }
    }
}

impl std::fmt::Debug for MoleculeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoleculeStore")
            .field("session_active", &self.session_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::open_store;
    use crate::StoreError;

    #[test]
    fn open_seeds_info_record() {
        let (_dir, store) = open_store();
        // A fresh environment begins allocating molecule ids at zero.
        let mut txn = store.begin().unwrap();
        let mol = txn.create_molecule().unwrap();
        assert_eq!(mol.as_u32(), 0);
    }

    #[test]
    fn second_begin_is_rejected() {
        let (_dir, store) = open_store();
        let _txn = store.begin().unwrap();
        assert!(matches!(store.begin(), Err(StoreError::TransactionActive)));
    }

    #[test]
    fn dropping_session_releases_writer() {
        let (_dir, store) = open_store();
        {
            let _txn = store.begin().unwrap();
            assert!(store.session_active());
        }
        assert!(!store.session_active());
        store.begin().unwrap();
    }

    #[test]
    fn put_get_value_roundtrip() {
        let (_dir, store) = open_store();
        store.put_value(&"answer", &42u64).unwrap();
        let value: u64 = store.get_value(&"answer", 0).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn get_value_falls_back_to_default() {
        let (_dir, store) = open_store();
        let value: String = store.get_value(&"missing", "fallback".to_owned()).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn put_value_rejected_during_session() {
        let (_dir, store) = open_store();
        let _txn = store.begin().unwrap();
        assert!(matches!(
            store.put_value(&1u32, &2u32),
            Err(StoreError::TransactionActive)
        ));
    }
}
