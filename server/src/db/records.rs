//! Database operations for the records table.

use chrono::{DateTime, Utc};
use fieldsync_engine::FieldValue;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

/// Field map as stored and sent over the wire.
pub type Fields = BTreeMap<String, FieldValue>;

/// A stored record row from the database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(rename = "id")]
    pub record_id: String,
    #[serde(rename = "values")]
    pub fields: Fields,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        let Json(fields): Json<Fields> = row.try_get("fields")?;
        Ok(StoredRecord {
            record_id: row.try_get("record_id")?,
            fields,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Outcome of applying a patch inside its transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    /// Stored values of the patched keys, and the new version
    Saved { values: Fields, version: i64 },
    /// Declined; nothing was written
    Rejected(String),
}

/// Merge `patch` into `fields`, refusing keys the record does not have.
///
/// Returns the stored values of the patched keys.
pub fn merge_patch(fields: &mut Fields, patch: &Fields) -> Result<Fields, String> {
    if let Some(unknown) = patch.keys().find(|key| !fields.contains_key(*key)) {
        return Err(format!("unknown field: {unknown}"));
    }

    let mut saved = Fields::new();
    for (key, value) in patch {
        fields.insert(key.clone(), value.clone());
        saved.insert(key.clone(), value.clone());
    }
    Ok(saved)
}

/// Insert a record or replace all of its fields.
pub async fn upsert_record(
    pool: &PgPool,
    record_id: &str,
    fields: &Fields,
) -> Result<StoredRecord, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        INSERT INTO records (record_id, fields)
        VALUES ($1, $2)
        ON CONFLICT (record_id) DO UPDATE SET
            fields = EXCLUDED.fields,
            version = records.version + 1,
            updated_at = now()
        RETURNING record_id, fields, version, created_at, updated_at
        "#,
    )
    .bind(record_id)
    .bind(Json(fields))
    .fetch_one(pool)
    .await
}

/// Get a record by ID.
pub async fn get_record(
    pool: &PgPool,
    record_id: &str,
) -> Result<Option<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT record_id, fields, version, created_at, updated_at
        FROM records
        WHERE record_id = $1
        "#,
    )
    .bind(record_id)
    .fetch_optional(pool)
    .await
}

pub async fn record_exists(pool: &PgPool, record_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM records WHERE record_id = $1)")
        .bind(record_id)
        .fetch_one(pool)
        .await
}

/// Apply a patch atomically: the row is locked for the read-merge-write.
pub async fn apply_patch(
    pool: &PgPool,
    record_id: &str,
    patch: &Fields,
) -> Result<PatchOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT fields FROM records WHERE record_id = $1 FOR UPDATE")
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = row else {
        tx.rollback().await?;
        return Ok(PatchOutcome::Rejected(format!("unknown record: {record_id}")));
    };
    let Json(mut fields): Json<Fields> = row.try_get("fields")?;

    let values = match merge_patch(&mut fields, patch) {
        Ok(values) => values,
        Err(reason) => {
            tx.rollback().await?;
            return Ok(PatchOutcome::Rejected(reason));
        }
    };

    let version: i64 = sqlx::query_scalar(
        r#"
        UPDATE records
        SET fields = $2, version = version + 1, updated_at = now()
        WHERE record_id = $1
        RETURNING version
        "#,
    )
    .bind(record_id)
    .bind(Json(&fields))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(PatchOutcome::Saved { values, version })
}
