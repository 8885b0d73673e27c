//! Student favorite events

use sqlx::SqlitePool;
use tracing::debug;
use uniconnect_common::db::{parse_guid, Favorite};
use uniconnect_common::{Error, Result};
use uuid::Uuid;

use super::{ensure_event, ensure_student};

/// Mark an event as a favorite
///
/// Returns `false` if it already was one.
pub async fn add_favorite(pool: &SqlitePool, student_id: Uuid, event_id: Uuid) -> Result<bool> {
    let mut tx = pool.begin().await?;
    ensure_student(&mut tx, student_id).await?;
    ensure_event(&mut tx, event_id).await?;

    let result = sqlx::query(
        "INSERT INTO favorites (student_id, event_id) VALUES (?, ?) ON CONFLICT(student_id, event_id) DO NOTHING",
    )
    .bind(student_id.to_string())
    .bind(event_id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let added = result.rows_affected() == 1;
    debug!(student_id = %student_id, event_id = %event_id, added, "Added favorite");
    Ok(added)
}

pub async fn remove_favorite(pool: &SqlitePool, student_id: Uuid, event_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM favorites WHERE student_id = ? AND event_id = ?")
        .bind(student_id.to_string())
        .bind(event_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "favorite event {} for student {}",
            event_id, student_id
        )));
    }
    Ok(())
}

/// Favorites of a student, newest first
pub async fn list_favorites(pool: &SqlitePool, student_id: Uuid) -> Result<Vec<Favorite>> {
    let mut conn = pool.acquire().await?;
    ensure_student(&mut conn, student_id).await?;

    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT event_id, created_at
        FROM favorites
        WHERE student_id = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(student_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(event_id, created_at)| {
            Ok(Favorite {
                student_id,
                event_id: parse_guid("favorites.event_id", &event_id)?,
                created_at,
            })
        })
        .collect()
}
