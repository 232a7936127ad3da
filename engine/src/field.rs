//! Field keys and patches.
//!
//! A record carries a fixed set of fields that is known at compile time.
//! Applications describe it with a fieldless enum implementing [`FieldKey`],
//! which lets every per-field map in the engine be keyed by that enum
//! instead of by free-form strings.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A single field value as exchanged with the persistence endpoint.
pub type FieldValue = serde_json::Value;

/// Field values keyed by field.
///
/// `BTreeMap` keeps iteration and serialization order deterministic.
pub type Patch<K> = BTreeMap<K, FieldValue>;

/// The closed set of fields of a record type.
///
/// Implement on a fieldless enum. `ALL` lists every variant exactly once and
/// `name` returns the wire name used by the endpoint, which should agree
/// with the enum's serde representation.
///
/// ```rust
/// use fieldsync_engine::FieldKey;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// enum CardField {
///     Title,
///     DueDate,
/// }
///
/// impl FieldKey for CardField {
///     const ALL: &'static [Self] = &[CardField::Title, CardField::DueDate];
///
///     fn name(self) -> &'static str {
///         match self {
///             CardField::Title => "title",
///             CardField::DueDate => "dueDate",
///         }
///     }
/// }
///
/// assert_eq!(CardField::from_name("dueDate"), Some(CardField::DueDate));
/// assert_eq!(CardField::from_name("color"), None);
/// ```
pub trait FieldKey:
    Copy + Ord + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every field of the record type.
    const ALL: &'static [Self];

    /// Wire name of the field.
    fn name(self) -> &'static str;

    /// Look a field up by its wire name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.name() == name)
    }
}

/// Wire names of a set of keys, in key order.
pub fn key_names<K: FieldKey>(keys: impl IntoIterator<Item = K>) -> Vec<&'static str> {
    keys.into_iter().map(FieldKey::name).collect()
}
