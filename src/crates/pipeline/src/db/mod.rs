//! Database module for the content pipeline
//!
//! Holds the two records the pipeline owns state in: posts (lifecycle status
//! and step outputs) and website settings (read-only brand configuration).
//! Table names come from configuration, so the schema is created at startup
//! rather than through static migrations.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod schema;

pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
pub use models::{Post, WebsiteSettings};
pub use repositories::{PostRepository, SettingsRepository};
pub use schema::ensure_schema;
