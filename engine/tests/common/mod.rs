//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use fieldsync_engine::{FieldKey, FieldSynchronizer, Patch, SyncConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEBOUNCE_MS: u64 = 300;
pub const SAVED_DISPLAY_MS: u64 = 1_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    A,
    B,
    C,
}

impl FieldKey for Field {
    const ALL: &'static [Self] = &[Field::A, Field::B, Field::C];

    fn name(self) -> &'static str {
        match self {
            Field::A => "a",
            Field::B => "b",
            Field::C => "c",
        }
    }
}

pub fn config() -> SyncConfig {
    SyncConfig::default()
        .with_debounce_ms(DEBOUNCE_MS)
        .with_saved_display_ms(SAVED_DISPLAY_MS)
}

/// `{a: 1, b: 1, c: 1}`
pub fn synchronizer() -> FieldSynchronizer<Field> {
    FieldSynchronizer::new(
        "record-1",
        Patch::from([(Field::A, json!(1)), (Field::B, json!(1)), (Field::C, json!(1))]),
        config(),
    )
    .unwrap()
}
