//! Club, student and event rows
//!
//! Registration and editing belong to the surrounding application; this is the
//! minimal write/read surface the recommendation and join paths depend on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uniconnect_common::db::{parse_guid, Event};
use uniconnect_common::tags::{assign_event_tags, assign_student_interests};
use uniconnect_common::{Error, Result};
use uuid::Uuid;

use super::{ensure_club, format_date, parse_date, to_count};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClub {
    pub name: String,
    pub university: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudent {
    pub username: String,
    pub email: String,
    pub university: String,
    pub department: String,
    #[serde(default = "default_grade")]
    pub grade: u8,
    /// Raw interest tag names; normalized on insert
    #[serde(default)]
    pub interests: Vec<String>,
}

fn default_grade() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub club_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub university: String,
    pub event_date: NaiveDate,
    /// 0 means unbounded
    pub capacity: u32,
    /// Raw tag names; normalized on insert
    #[serde(default)]
    pub tags: Vec<String>,
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::InvalidInput(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

pub async fn insert_club(pool: &SqlitePool, club: &NewClub) -> Result<Uuid> {
    require_non_blank("club name", &club.name)?;
    require_non_blank("university", &club.university)?;

    let guid = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO clubs (guid, name, university, city, description) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(club.name.trim())
    .bind(club.university.trim())
    .bind(club.city.trim())
    .bind(&club.description)
    .execute(pool)
    .await?;

    Ok(guid)
}

/// Insert a student together with their interest tags
pub async fn insert_student(pool: &SqlitePool, student: &NewStudent) -> Result<Uuid> {
    require_non_blank("username", &student.username)?;
    require_non_blank("email", &student.email)?;

    let guid = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO students (guid, username, email, university, department, grade)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(student.username.trim())
    .bind(student.email.trim().to_lowercase())
    .bind(student.university.trim())
    .bind(student.department.trim())
    .bind(i64::from(student.grade))
    .execute(&mut *tx)
    .await?;

    assign_student_interests(&mut tx, guid, &student.interests).await?;
    tx.commit().await?;

    Ok(guid)
}

/// Insert an event together with its tags; the club must exist
pub async fn insert_event(pool: &SqlitePool, event: &NewEvent) -> Result<Uuid> {
    require_non_blank("title", &event.title)?;

    let guid = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    ensure_club(&mut tx, event.club_id).await?;

    sqlx::query(
        r#"
        INSERT INTO events (guid, club_id, title, description, category, city, university, event_date, capacity)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(event.club_id.to_string())
    .bind(event.title.trim())
    .bind(&event.description)
    .bind(event.category.trim())
    .bind(event.city.trim())
    .bind(event.university.trim())
    .bind(format_date(event.event_date))
    .bind(i64::from(event.capacity))
    .execute(&mut *tx)
    .await?;

    assign_event_tags(&mut tx, guid, &event.tags).await?;
    tx.commit().await?;

    Ok(guid)
}

type EventRow = (String, String, String, String, String, String, String, String, i64, i64, i64);

pub async fn get_event(pool: &SqlitePool, event_id: Uuid) -> Result<Event> {
    let row: Option<EventRow> = sqlx::query_as(
        r#"
        SELECT guid, club_id, title, description, category, city, university, event_date,
               capacity, participants_count, waiting_list_count
        FROM events WHERE guid = ?
        "#,
    )
    .bind(event_id.to_string())
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| Error::NotFound(format!("event {}", event_id)))?;
    Ok(Event {
        guid: parse_guid("events.guid", &row.0)?,
        club_id: parse_guid("events.club_id", &row.1)?,
        title: row.2,
        description: row.3,
        category: row.4,
        city: row.5,
        university: row.6,
        event_date: parse_date(&row.7)?,
        capacity: to_count(row.8),
        participants_count: to_count(row.9),
        waiting_list_count: to_count(row.10),
    })
}
