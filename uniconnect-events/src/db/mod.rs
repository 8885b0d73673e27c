//! Database access for the event services

pub mod catalog;
pub mod favorites;
pub mod participation;
pub mod profile;

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use uniconnect_common::{Error, Result};
use uuid::Uuid;

/// Stored date format for `events.event_date`
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| Error::Internal(format!("Invalid event_date {:?}: {}", value, e)))
}

/// Counters are stored as INTEGER; negative values never pass the CHECK constraints
pub(crate) fn to_count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

pub(crate) async fn ensure_student(conn: &mut SqliteConnection, student_id: Uuid) -> Result<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT guid FROM students WHERE guid = ?")
        .bind(student_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("student {}", student_id)))
}

pub(crate) async fn ensure_event(conn: &mut SqliteConnection, event_id: Uuid) -> Result<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT guid FROM events WHERE guid = ?")
        .bind(event_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("event {}", event_id)))
}

pub(crate) async fn ensure_club(conn: &mut SqliteConnection, club_id: Uuid) -> Result<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT guid FROM clubs WHERE guid = ?")
        .bind(club_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("club {}", club_id)))
}
