//! CORS middleware configuration

use tower_http::cors::CorsLayer;

/// Permissive CORS; the API sits behind the deployment's own gateway
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
