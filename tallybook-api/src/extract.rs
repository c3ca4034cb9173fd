//! Request extractors with [`ApiError`] rejections

use crate::error::ApiError;
use axum::extract::FromRequest;

/// `axum::Json` whose rejection is an [`ApiError`]
///
/// Malformed or non-JSON bodies become a 400 with the usual error body
/// instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::IntoResponse,
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        amount: f64,
    }

    fn request(content_type: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_extracts() {
        let ApiJson(payload) =
            ApiJson::<Payload>::from_request(request("application/json", r#"{"amount":1.5}"#), &())
                .await
                .unwrap();
        assert_eq!(payload.amount, 1.5);
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_bad_request() {
        let err = ApiJson::<Payload>::from_request(request("application/json", "{not json"), &())
            .await
            .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let err = ApiJson::<Payload>::from_request(request("text/plain", r#"{"amount":1}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
