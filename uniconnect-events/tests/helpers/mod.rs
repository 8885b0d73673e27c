//! Shared fixtures for uniconnect-events integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uniconnect_common::db::{init_database, DatabaseOptions};
use uniconnect_events::db::catalog::{insert_club, insert_event, insert_student, NewClub, NewEvent, NewStudent};
use uuid::Uuid;

/// Temporary database; the directory lives as long as this value
pub struct TestDb {
    pub dir: TempDir,
    pub pool: SqlitePool,
}

pub async fn create_test_db() -> TestDb {
    create_test_db_with(DatabaseOptions::default()).await
}

pub async fn create_test_db_with(options: DatabaseOptions) -> TestDb {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("uniconnect_test.db"), &options)
        .await
        .unwrap();
    TestDb { dir, pool }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub async fn seed_club(pool: &SqlitePool) -> Uuid {
    insert_club(
        pool,
        &NewClub {
            name: "Bilişim Kulübü".to_string(),
            university: "ODTÜ".to_string(),
            city: "Ankara".to_string(),
            description: String::new(),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_student(pool: &SqlitePool, username: &str, interests: &[&str]) -> Uuid {
    insert_student(
        pool,
        &NewStudent {
            username: username.to_string(),
            email: format!("{}@example.edu", username),
            university: "ODTÜ".to_string(),
            department: "CENG".to_string(),
            grade: 2,
            interests: interests.iter().map(|s| s.to_string()).collect(),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_event(
    pool: &SqlitePool,
    club_id: Uuid,
    title: &str,
    description: &str,
    event_date: NaiveDate,
    capacity: u32,
    tags: &[&str],
) -> Uuid {
    insert_event(
        pool,
        &NewEvent {
            club_id,
            title: title.to_string(),
            description: description.to_string(),
            category: "genel".to_string(),
            city: "Ankara".to_string(),
            university: "ODTÜ".to_string(),
            event_date,
            capacity,
            tags: tags.iter().map(|s| s.to_string()).collect(),
        },
    )
    .await
    .unwrap()
}

/// Rows in `participations` for an event, by status
pub async fn count_participations(pool: &SqlitePool, event_id: Uuid, status: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM participations WHERE event_id = ? AND status = ?")
        .bind(event_id.to_string())
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap()
}
