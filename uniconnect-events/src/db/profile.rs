//! Student interest profiles and candidate event pools

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sqlx::SqlitePool;
use uniconnect_common::db::parse_guid;
use uniconnect_common::Result;
use uuid::Uuid;

use super::{ensure_student, format_date, parse_date, to_count};
use crate::recommend::{student_tag_union, tag_overlap, CandidateEvent};

/// What the recommender knows about a student
#[derive(Debug, Clone, Default)]
pub struct StudentProfile {
    pub student_id: Uuid,
    pub interest_tag_ids: HashSet<Uuid>,
    /// Normalized interest tag names, alphabetical
    pub interest_tag_names: Vec<String>,
    /// Tags of every event the student joined (confirmed or waitlisted)
    pub past_event_tag_ids: HashSet<Uuid>,
    /// `title + " " + description` of joined events, newest first
    pub past_event_texts: Vec<String>,
}

impl StudentProfile {
    /// Interest tags plus tags from participation history
    pub fn tag_union(&self) -> HashSet<Uuid> {
        student_tag_union(&self.interest_tag_ids, &self.past_event_tag_ids)
    }
}

pub async fn load_student_profile(pool: &SqlitePool, student_id: Uuid) -> Result<StudentProfile> {
    let mut conn = pool.acquire().await?;
    ensure_student(&mut conn, student_id).await?;
    let student = student_id.to_string();

    let interests: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT t.guid, t.name
        FROM student_interests si
        JOIN tags t ON t.guid = si.tag_id
        WHERE si.student_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(&student)
    .fetch_all(&mut *conn)
    .await?;

    let joined: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT e.title, e.description
        FROM participations p
        JOIN events e ON e.guid = p.event_id
        WHERE p.student_id = ?
        ORDER BY p.created_at DESC, p.rowid DESC
        "#,
    )
    .bind(&student)
    .fetch_all(&mut *conn)
    .await?;

    let past_tags: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT et.tag_id
        FROM participations p
        JOIN event_tags et ON et.event_id = p.event_id
        WHERE p.student_id = ?
        "#,
    )
    .bind(&student)
    .fetch_all(&mut *conn)
    .await?;

    let mut profile = StudentProfile {
        student_id,
        ..StudentProfile::default()
    };
    for (guid, name) in interests {
        profile.interest_tag_ids.insert(parse_guid("tags.guid", &guid)?);
        profile.interest_tag_names.push(name);
    }
    for (title, description) in joined {
        profile.past_event_texts.push(format!("{} {}", title, description));
    }
    for guid in past_tags {
        profile.past_event_tag_ids.insert(parse_guid("event_tags.tag_id", &guid)?);
    }

    tracing::debug!(
        student_id = %student_id,
        interests = profile.interest_tag_names.len(),
        joined_events = profile.past_event_texts.len(),
        "Loaded student profile"
    );

    Ok(profile)
}

/// Events dated `today` or later that the student has not joined
///
/// Ordered by date then title; each carries its tag overlap with the profile.
pub async fn load_candidates(
    pool: &SqlitePool,
    profile: &StudentProfile,
    today: NaiveDate,
) -> Result<Vec<CandidateEvent>> {
    let today = format_date(today);
    let student = profile.student_id.to_string();

    let rows: Vec<(String, String, String, i64, String)> = sqlx::query_as(
        r#"
        SELECT guid, title, description, participants_count, event_date
        FROM events
        WHERE event_date >= ?
          AND guid NOT IN (SELECT event_id FROM participations WHERE student_id = ?)
        ORDER BY event_date, title
        "#,
    )
    .bind(&today)
    .bind(&student)
    .fetch_all(pool)
    .await?;

    let tag_rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT et.event_id, et.tag_id
        FROM event_tags et
        JOIN events e ON e.guid = et.event_id
        WHERE e.event_date >= ?
        "#,
    )
    .bind(&today)
    .fetch_all(pool)
    .await?;

    let mut event_tags: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for (event_id, tag_id) in tag_rows {
        event_tags
            .entry(parse_guid("event_tags.event_id", &event_id)?)
            .or_default()
            .insert(parse_guid("event_tags.tag_id", &tag_id)?);
    }

    let student_tags = profile.tag_union();
    let empty = HashSet::new();

    rows.into_iter()
        .map(|(guid, title, description, participants_count, event_date)| {
            let id = parse_guid("events.guid", &guid)?;
            let tags = event_tags.get(&id).unwrap_or(&empty);
            Ok(CandidateEvent {
                id,
                title,
                description,
                tag_overlap: tag_overlap(tags, &student_tags),
                participants_count: to_count(participants_count),
                event_date: Some(parse_date(&event_date)?),
            })
        })
        .collect()
}
