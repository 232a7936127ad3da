//! Database operations for the watchers table.

use fieldsync_engine::WatchState;
use sqlx::{PgPool, Row};

/// Set or clear `member`'s watch flag on a record. Idempotent.
pub async fn set_watching(
    pool: &PgPool,
    record_id: &str,
    member: &str,
    watching: bool,
) -> Result<(), sqlx::Error> {
    let query = if watching {
        r#"
        INSERT INTO watchers (record_id, member)
        VALUES ($1, $2)
        ON CONFLICT (record_id, member) DO NOTHING
        "#
    } else {
        "DELETE FROM watchers WHERE record_id = $1 AND member = $2"
    };

    sqlx::query(query)
        .bind(record_id)
        .bind(member)
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether `member` watches the record, and how many members do.
pub async fn watch_state(
    pool: &PgPool,
    record_id: &str,
    member: &str,
) -> Result<WatchState, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count,
               COALESCE(BOOL_OR(member = $2), false) AS watching
        FROM watchers
        WHERE record_id = $1
        "#,
    )
    .bind(record_id)
    .bind(member)
    .fetch_one(pool)
    .await?;

    let count: i64 = row.try_get("count")?;
    Ok(WatchState {
        watching: row.try_get("watching")?,
        count: count.max(0) as u64,
    })
}
