//! Database models
//!
//! All timestamp fields are stored as RFC 3339 strings (TEXT in SQLite).
//! List-valued fields (keywords, image prompts, image pointers) and the
//! metadata object are stored as JSON text.

pub mod post;
pub mod website_settings;

pub use post::Post;
pub use website_settings::WebsiteSettings;
