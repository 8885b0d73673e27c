//! Tag name normalization and tag storage
//!
//! Tags are shared between student interests and event metadata. Two tags are
//! the same entity iff their normalized names are equal, so every write path
//! goes through [`TagName`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::db::parse_guid;
use crate::Result;

/// Trim, lowercase and collapse internal whitespace runs to a single space.
///
/// Idempotent: `normalize_tag_name(&normalize_tag_name(x)) == normalize_tag_name(x)`.
pub fn normalize_tag_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A tag name that is already normalized and non-empty
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Normalize `raw`; returns `None` when nothing is left
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_tag_name(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalize a batch of raw names, dropping blanks and duplicates
    ///
    /// Output is sorted by normalized name.
    pub fn parse_all<I, S>(raw_names: I) -> Vec<TagName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw_names
            .into_iter()
            .filter_map(|name| TagName::parse(name.as_ref()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TagName {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        TagName::parse(&value).ok_or_else(|| format!("empty tag name: {:?}", value))
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.0
    }
}

/// Return the id of the tag named `name`, creating it if needed
pub async fn get_or_create_tag(conn: &mut SqliteConnection, name: &TagName) -> Result<Uuid> {
    sqlx::query("INSERT INTO tags (guid, name) VALUES (?, ?) ON CONFLICT(name) DO NOTHING")
        .bind(Uuid::new_v4().to_string())
        .bind(name.as_str())
        .execute(&mut *conn)
        .await?;

    let guid: String = sqlx::query_scalar("SELECT guid FROM tags WHERE name = ?")
        .bind(name.as_str())
        .fetch_one(&mut *conn)
        .await?;

    parse_guid("tags.guid", &guid)
}

/// Replace the tag set of an event with the normalized form of `raw_names`
///
/// Returns the ids of the assigned tags.
pub async fn assign_event_tags<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    raw_names: &[S],
) -> Result<Vec<Uuid>> {
    sqlx::query("DELETE FROM event_tags WHERE event_id = ?")
        .bind(event_id.to_string())
        .execute(&mut *conn)
        .await?;

    let mut tag_ids = Vec::new();
    for name in TagName::parse_all(raw_names) {
        let tag_id = get_or_create_tag(conn, &name).await?;
        sqlx::query("INSERT INTO event_tags (event_id, tag_id) VALUES (?, ?)")
            .bind(event_id.to_string())
            .bind(tag_id.to_string())
            .execute(&mut *conn)
            .await?;
        tag_ids.push(tag_id);
    }

    Ok(tag_ids)
}

/// Replace a student's interest tags with the normalized form of `raw_names`
pub async fn assign_student_interests<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    student_id: Uuid,
    raw_names: &[S],
) -> Result<Vec<Uuid>> {
    sqlx::query("DELETE FROM student_interests WHERE student_id = ?")
        .bind(student_id.to_string())
        .execute(&mut *conn)
        .await?;

    let mut tag_ids = Vec::new();
    for name in TagName::parse_all(raw_names) {
        let tag_id = get_or_create_tag(conn, &name).await?;
        sqlx::query("INSERT INTO student_interests (student_id, tag_id) VALUES (?, ?)")
            .bind(student_id.to_string())
            .bind(tag_id.to_string())
            .execute(&mut *conn)
            .await?;
        tag_ids.push(tag_id);
    }

    Ok(tag_ids)
}
