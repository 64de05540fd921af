// Version information for content-pipeline builds and deploy archives

/// Version string for the content-pipeline crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// User agent sent to external services
pub fn user_agent() -> String {
    format!("{}/{}", PKG_NAME, VERSION)
}
