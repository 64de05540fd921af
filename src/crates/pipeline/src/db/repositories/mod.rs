//! Repository implementations for database access
//!
//! Repositories carry the pool and their configured table name.

pub mod post_repo;
pub mod settings_repo;

pub use post_repo::PostRepository;
pub use settings_repo::SettingsRepository;
