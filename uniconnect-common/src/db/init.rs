//! Database initialization
//!
//! Creates the database file on first run and brings the schema up with
//! idempotent `CREATE TABLE IF NOT EXISTS` statements, so opening an existing
//! database is always safe.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

use crate::Result;

/// Connection pool settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// SQLite busy_timeout applied to every connection
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 250,
            max_connections: 10,
        }
    }
}

/// Open (creating if necessary) the database at `db_path` and ensure the schema exists
pub async fn init_database(db_path: &Path, options: &DatabaseOptions) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas set here apply to every pooled connection
    let connect_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(options.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(connect_options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    info!(
        busy_timeout_ms = options.busy_timeout_ms,
        max_connections = options.max_connections,
        "Database ready"
    );

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_tags_table(pool).await?;
    create_clubs_table(pool).await?;
    create_students_table(pool).await?;
    create_student_interests_table(pool).await?;
    create_events_table(pool).await?;
    create_event_tags_table(pool).await?;
    create_participations_table(pool).await?;
    create_favorites_table(pool).await?;
    Ok(())
}

pub async fn create_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_clubs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clubs (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            university TEXT NOT NULL,
            city TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            university TEXT NOT NULL,
            department TEXT NOT NULL,
            grade INTEGER NOT NULL DEFAULT 1 CHECK (grade >= 0),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_student_interests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS student_interests (
            student_id TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            tag_id TEXT NOT NULL REFERENCES tags(guid) ON DELETE CASCADE,
            PRIMARY KEY (student_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            guid TEXT PRIMARY KEY,
            club_id TEXT NOT NULL REFERENCES clubs(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            university TEXT NOT NULL DEFAULT '',
            event_date TEXT NOT NULL,
            capacity INTEGER NOT NULL DEFAULT 50 CHECK (capacity >= 0),
            participants_count INTEGER NOT NULL DEFAULT 0 CHECK (participants_count >= 0),
            waiting_list_count INTEGER NOT NULL DEFAULT 0 CHECK (waiting_list_count >= 0),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_date ON events(event_date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_club ON events(club_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_event_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS event_tags (
            event_id TEXT NOT NULL REFERENCES events(guid) ON DELETE CASCADE,
            tag_id TEXT NOT NULL REFERENCES tags(guid) ON DELETE CASCADE,
            PRIMARY KEY (event_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_participations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participations (
            guid TEXT PRIMARY KEY,
            student_id TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            event_id TEXT NOT NULL REFERENCES events(guid) ON DELETE CASCADE,
            status TEXT NOT NULL CHECK (status IN ('confirmed', 'waitlisted')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (student_id, event_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_participations_event ON participations(event_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_favorites_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorites (
            student_id TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            event_id TEXT NOT NULL REFERENCES events(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (student_id, event_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
