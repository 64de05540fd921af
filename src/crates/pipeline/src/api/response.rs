//! API response helpers
//!
//! Bodies are the plain JSON documents callers and the workflow service
//! consume; there is no envelope.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// 200 OK with a JSON body
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(data))
}

/// 202 Accepted with a JSON body
pub fn accepted<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let response = ok(serde_json::json!({"a": 1})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let response = accepted(serde_json::json!({"a": 1})).into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
