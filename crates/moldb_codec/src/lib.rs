//! # MolDB Codec
//!
//! Record schemas and CBOR encoding/decoding for MolDB.
//!
//! This crate defines the fixed-field records the store persists
//! (environment info, molecule descriptors, atoms, bonds) and the byte
//! codec for them. Records are CBOR maps keyed by field name, which keeps
//! them tolerant to schema evolution: fields absent from the input decode
//! to their defaults and unknown fields are ignored.
//!
//! ## Usage
//!
//! ```
//! use moldb_codec::{from_bytes, to_bytes, BondRecord};
//!
//! let bond = BondRecord { first_atom: 0, second_atom: 1, order: 2 };
//! let bytes = to_bytes(&bond).unwrap();
//! let decoded: BondRecord = from_bytes(&bytes).unwrap();
//! assert_eq!(bond, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod records;

pub use error::{CodecError, CodecResult};
pub use records::{AtomRecord, BondRecord, EnvInfo, MoleculeRecord, Vec3, SCHEMA_VERSION};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
pub fn to_bytes<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn molecule_record_roundtrip() {
        let record = MoleculeRecord {
            atom_collection: "5_db_atom".to_owned(),
            bond_collection: "5_db_bond".to_owned(),
            next_atom_id: 12,
            next_bond_id: 4,
        };
        let decoded: MoleculeRecord = from_bytes(&to_bytes(&record).unwrap()).unwrap();
        assert_eq!(record, decoded);
    }

    proptest! {
        #[test]
        fn atom_bond_list_survives_encoding(
            element in 0u32..200,
            bonds in proptest::collection::vec(any::<u32>(), 0..64),
        ) {
            let atom = AtomRecord {
                element,
                position: Vec3::new(0.5, 1.5, -3.0),
                bonds: bonds.clone(),
            };
            let decoded: AtomRecord = from_bytes(&to_bytes(&atom).unwrap()).unwrap();
            // The bond set is persisted as a sequence; order must be stable.
            prop_assert_eq!(decoded.bonds, bonds);
            prop_assert_eq!(decoded.element, element);
        }
    }
}
