//! uniconnect-events library
//!
//! Event recommendations (tag overlap with optional word-embedding similarity)
//! and capacity-aware event joins for university clubs.

pub mod db;
pub mod recommend;
pub mod service;

pub use db::participation::JoinOutcome;
pub use recommend::{RecommendOptions, RecommendationMethod, Recommendations, TieBreak};
pub use service::EventService;
