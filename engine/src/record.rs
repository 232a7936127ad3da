//! The local optimistic store for one record.

use crate::{error::Result, Error, FieldKey, FieldValue, Patch, RecordId};
use serde::Serialize;

/// The currently displayed values of a record.
///
/// Always holds a value for every field of `K`: the only way to build one is
/// [`Record::from_snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<K: FieldKey> {
    /// Identifier passed to the persistence endpoint
    pub id: RecordId,
    /// Current value of every field
    fields: Patch<K>,
}

impl<K: FieldKey> Record<K> {
    /// Seed a record from an authoritative snapshot.
    ///
    /// Fails if the snapshot lacks any field of `K`.
    pub fn from_snapshot(id: impl Into<RecordId>, snapshot: Patch<K>) -> Result<Self> {
        let id = id.into();
        if let Some(missing) = K::ALL.iter().find(|key| !snapshot.contains_key(key)) {
            return Err(Error::MissingField {
                record_id: id,
                field: missing.name(),
            });
        }

        Ok(Self {
            id,
            fields: snapshot,
        })
    }

    /// Current value of a field.
    pub fn get(&self, key: K) -> Option<&FieldValue> {
        self.fields.get(&key)
    }

    /// All current values.
    pub fn fields(&self) -> &Patch<K> {
        &self.fields
    }

    /// Overwrite a field, returning the previous value.
    pub(crate) fn set(&mut self, key: K, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(key, value)
    }

    /// Overwrite every field present in `values`.
    pub(crate) fn merge(&mut self, values: Patch<K>) {
        self.fields.extend(values);
    }
}
