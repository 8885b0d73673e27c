//! Capacity-aware event joins
//!
//! A join creates the (student, event) participation exactly once, as
//! `confirmed` while the event has room and `waitlisted` once it is full, and
//! bumps the matching counter in the same transaction. Repeating a join returns
//! the existing participation unchanged.
//!
//! The transaction opens with a no-op `UPDATE` of the event row. In SQLite the
//! first write takes the database write lock, so every read that decides the
//! status happens while concurrent joins (from any process) are held off.
//! This plays the role of `SELECT ... FOR UPDATE` on the event row.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uniconnect_common::db::{is_full, parse_guid, retry_on_lock, ParticipationStatus};
use uniconnect_common::{Error, Result};
use uuid::Uuid;

use super::{ensure_club, ensure_student, to_count};

/// Result of a join request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    pub participation_id: Uuid,
    pub status: ParticipationStatus,
    /// True if the participation existed before this request
    pub already_existed: bool,
    pub capacity: u32,
    pub participants_count: u32,
    pub waiting_list_count: u32,
}

/// Join `student_id` to `event_id`, retrying on lock contention for up to `max_lock_wait_ms`
///
/// # Errors
/// - `NotFound` if the student or event does not exist (nothing is written)
/// - `Conflict` if the database stayed locked past the retry budget
pub async fn join_event(
    pool: &SqlitePool,
    student_id: Uuid,
    event_id: Uuid,
    max_lock_wait_ms: u64,
) -> Result<JoinOutcome> {
    let outcome = retry_on_lock("event join", max_lock_wait_ms, || {
        join_event_once(pool, student_id, event_id)
    })
    .await?;

    info!(
        student_id = %student_id,
        event_id = %event_id,
        status = %outcome.status,
        already_existed = outcome.already_existed,
        participants_count = outcome.participants_count,
        waiting_list_count = outcome.waiting_list_count,
        "Processed event join"
    );

    Ok(outcome)
}

async fn join_event_once(pool: &SqlitePool, student_id: Uuid, event_id: Uuid) -> Result<JoinOutcome> {
    let student = student_id.to_string();
    let event = event_id.to_string();

    let mut tx = pool.begin().await?;

    // Write lock first, reads after
    let locked = sqlx::query("UPDATE events SET participants_count = participants_count WHERE guid = ?")
        .bind(&event)
        .execute(&mut *tx)
        .await?;
    if locked.rows_affected() == 0 {
        return Err(Error::NotFound(format!("event {}", event_id)));
    }
    ensure_student(&mut tx, student_id).await?;

    let (capacity, participants_count, waiting_list_count): (i64, i64, i64) = sqlx::query_as(
        "SELECT capacity, participants_count, waiting_list_count FROM events WHERE guid = ?",
    )
    .bind(&event)
    .fetch_one(&mut *tx)
    .await?;
    let (capacity, participants_count, waiting_list_count) = (
        to_count(capacity),
        to_count(participants_count),
        to_count(waiting_list_count),
    );

    let existing: Option<(String, String)> = sqlx::query_as(
        "SELECT guid, status FROM participations WHERE student_id = ? AND event_id = ?",
    )
    .bind(&student)
    .bind(&event)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some((guid, status)) = existing {
        tx.rollback().await?;
        return Ok(JoinOutcome {
            participation_id: parse_guid("participations.guid", &guid)?,
            status: status.parse()?,
            already_existed: true,
            capacity,
            participants_count,
            waiting_list_count,
        });
    }

    let status = if is_full(capacity, participants_count) {
        ParticipationStatus::Waitlisted
    } else {
        ParticipationStatus::Confirmed
    };

    let participation_id = Uuid::new_v4();
    sqlx::query("INSERT INTO participations (guid, student_id, event_id, status) VALUES (?, ?, ?, ?)")
        .bind(participation_id.to_string())
        .bind(&student)
        .bind(&event)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

    let bump = match status {
        ParticipationStatus::Confirmed => {
            "UPDATE events SET participants_count = participants_count + 1, updated_at = CURRENT_TIMESTAMP WHERE guid = ?"
        }
        ParticipationStatus::Waitlisted => {
            "UPDATE events SET waiting_list_count = waiting_list_count + 1, updated_at = CURRENT_TIMESTAMP WHERE guid = ?"
        }
    };
    sqlx::query(bump).bind(&event).execute(&mut *tx).await?;

    tx.commit().await?;

    let (participants_count, waiting_list_count) = match status {
        ParticipationStatus::Confirmed => (participants_count + 1, waiting_list_count),
        ParticipationStatus::Waitlisted => (participants_count, waiting_list_count + 1),
    };

    Ok(JoinOutcome {
        participation_id,
        status,
        already_existed: false,
        capacity,
        participants_count,
        waiting_list_count,
    })
}

/// A student's participation with event details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentParticipation {
    pub participation_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_date: String,
    pub status: ParticipationStatus,
    pub created_at: String,
}

/// Participations of a student, newest first
pub async fn list_student_participations(
    pool: &SqlitePool,
    student_id: Uuid,
) -> Result<Vec<StudentParticipation>> {
    let mut conn = pool.acquire().await?;
    ensure_student(&mut conn, student_id).await?;

    let rows: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
        r#"
        SELECT p.guid, e.guid, e.title, e.event_date, p.status, p.created_at
        FROM participations p
        JOIN events e ON e.guid = p.event_id
        WHERE p.student_id = ?
        ORDER BY p.created_at DESC, p.rowid DESC
        "#,
    )
    .bind(student_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(guid, event_guid, event_title, event_date, status, created_at)| {
            Ok(StudentParticipation {
                participation_id: parse_guid("participations.guid", &guid)?,
                event_id: parse_guid("events.guid", &event_guid)?,
                event_title,
                event_date,
                status: status.parse()?,
                created_at,
            })
        })
        .collect()
}

/// Per-event participation figures for a club
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParticipationSummary {
    pub event_id: Uuid,
    pub title: String,
    pub event_date: String,
    pub capacity: u32,
    pub participants_count: u32,
    pub waiting_list_count: u32,
    pub is_full: bool,
}

/// Participation figures for every event of a club, by date
pub async fn club_participation_summary(
    pool: &SqlitePool,
    club_id: Uuid,
) -> Result<Vec<EventParticipationSummary>> {
    let mut conn = pool.acquire().await?;
    ensure_club(&mut conn, club_id).await?;

    let rows: Vec<(String, String, String, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT guid, title, event_date, capacity, participants_count, waiting_list_count
        FROM events
        WHERE club_id = ?
        ORDER BY event_date, title
        "#,
    )
    .bind(club_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(guid, title, event_date, capacity, participants, waiting)| {
            let capacity = to_count(capacity);
            let participants_count = to_count(participants);
            Ok(EventParticipationSummary {
                event_id: parse_guid("events.guid", &guid)?,
                title,
                event_date,
                capacity,
                participants_count,
                waiting_list_count: to_count(waiting),
                is_full: is_full(capacity, participants_count),
            })
        })
        .collect()
}
