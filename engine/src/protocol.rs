//! Wire types of the persistence endpoint contract.
//!
//! Shared by the HTTP client and the reference server. Keys are generic so
//! the server can work with plain strings while clients use their
//! [`FieldKey`](crate::FieldKey) enum.

use crate::{FieldValue, SaveFailure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of a save call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest<K: Ord> {
    pub patch: BTreeMap<K, FieldValue>,
}

/// Answer of a save call: `{"ok":true,"values":{..}}` or `{"ok":false,"error":".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse<K: Ord> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeMap<K, FieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<K: Ord> SaveResponse<K> {
    pub fn saved(values: BTreeMap<K, FieldValue>) -> Self {
        Self {
            ok: true,
            values: Some(values),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            values: None,
            error: Some(error.into()),
        }
    }

    /// Authoritative values, or the rejection.
    pub fn into_result(self) -> Result<BTreeMap<K, FieldValue>, SaveFailure> {
        if self.ok {
            Ok(self.values.unwrap_or_default())
        } else {
            Err(SaveFailure::Rejected(
                self.error.unwrap_or_else(|| "save rejected".to_string()),
            ))
        }
    }
}

/// Full field map of a record, as seeded or fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordValues<K: Ord> {
    pub values: BTreeMap<K, FieldValue>,
}

/// Body of a watch toggle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRequest {
    pub watching: bool,
}
