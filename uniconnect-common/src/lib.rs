//! # UniConnect Common Library
//!
//! Shared code for the UniConnect event services including:
//! - Database initialization, models and lock-retry helpers
//! - Configuration loading
//! - Tag name normalization and tag storage
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tags;

pub use error::{Error, Result};
pub use tags::{normalize_tag_name, TagName};
