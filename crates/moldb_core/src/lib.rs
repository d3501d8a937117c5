//! Transactional molecule store over an embedded ordered key-value engine.
//!
//! A [`MoleculeStore`] holds any number of molecules, each a graph of
//! atoms joined by bonds. Every molecule keeps its records in its own
//! named sub-databases, and all mutation flows through a single explicit
//! session transaction, the [`MoleculeTxn`].
//!
//! Removal is two-phase: marking an atom or bond writes a token into a
//! staging sub-database and repairs the adjacency immediately, while the
//! backing record survives until a cleanup pass purges it at the start of
//! the next fresh transaction or right after a commit. Until then the
//! removal can still be undone with the `unmark_*` operations.
//!
//! ```no_run
//! use moldb_core::{MoleculeStore, Vec3};
//!
//! # fn main() -> moldb_core::StoreResult<()> {
//! let store = MoleculeStore::open("/tmp/molecules")?;
//! let mut txn = store.begin()?;
//!
//! let mol = txn.create_molecule()?;
//! let c = txn.create_atom(mol, 6, Vec3::default())?;
//! let o = txn.create_atom(mol, 8, Vec3::new(1.2, 0.0, 0.0))?;
//! txn.create_bond(mol, c, o, 2)?;
//!
//! txn.commit()?;
//! # Ok(())
//! # }
//! ```

mod adjacency;
mod atom;
mod bond;
mod cleanup;
mod config;
mod error;
mod handles;
mod session;
mod store;
mod types;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use session::MoleculeTxn;
pub use store::MoleculeStore;
pub use types::{AtomId, AtomSnapshot, BondId, BondSnapshot, MoleculeId};

pub use moldb_codec::Vec3;
