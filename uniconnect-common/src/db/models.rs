//! Database models

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Parse a TEXT guid column, reporting the column on corruption
pub fn parse_guid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid guid in {}: {:?} ({})", column, value, e)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub guid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub guid: Uuid,
    pub name: String,
    pub university: String,
    pub city: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub guid: Uuid,
    pub username: String,
    pub email: String,
    pub university: String,
    pub department: String,
    pub grade: u8,
}

/// Event row including its capacity counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub guid: Uuid,
    pub club_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub university: String,
    pub event_date: NaiveDate,
    /// 0 means unbounded
    pub capacity: u32,
    pub participants_count: u32,
    pub waiting_list_count: u32,
}

impl Event {
    pub fn is_full(&self) -> bool {
        is_full(self.capacity, self.participants_count)
    }
}

/// `capacity > 0 && participants_count >= capacity`
pub fn is_full(capacity: u32, participants_count: u32) -> bool {
    capacity > 0 && participants_count >= capacity
}

/// Participation status, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    Confirmed,
    Waitlisted,
}

impl ParticipationStatus {
    /// Convert to the stored string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Confirmed => "confirmed",
            ParticipationStatus::Waitlisted => "waitlisted",
        }
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "confirmed" => Ok(ParticipationStatus::Confirmed),
            "waitlisted" => Ok(ParticipationStatus::Waitlisted),
            other => Err(Error::Internal(format!("Unknown participation status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participation {
    pub guid: Uuid,
    pub student_id: Uuid,
    pub event_id: Uuid,
    pub status: ParticipationStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub student_id: Uuid,
    pub event_id: Uuid,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_full_treats_zero_capacity_as_unbounded() {
        assert!(!is_full(0, 0));
        assert!(!is_full(0, 10_000));
        assert!(!is_full(2, 1));
        assert!(is_full(2, 2));
        assert!(is_full(2, 3));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [ParticipationStatus::Confirmed, ParticipationStatus::Waitlisted] {
            assert_eq!(status.as_str().parse::<ParticipationStatus>().unwrap(), status);
        }
        assert!("pending".parse::<ParticipationStatus>().is_err());
    }
}
