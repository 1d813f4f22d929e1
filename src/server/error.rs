//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<Response, AppError>`; every
//! [`vidforge_common::Error`] converts into an [`AppError`] with `?`.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vidforge_common::{ByteRange, Error};

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Error {
        &self.inner
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.inner, "Server error in handler");
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        // 416 carries the asset size and no body.
        if let Error::InvalidRange { total_size, .. } = &self.inner {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&ByteRange::unsatisfied(*total_size)) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            return response;
        }

        let code = match &self.inner {
            Error::NotFound { .. } => "not_found",
            Error::EmptyOrCorrupt(_) => "empty_or_corrupt",
            Error::UnsupportedFormat { .. } => "unsupported_format",
            Error::InvalidRange { .. } => "invalid_range",
            Error::ConversionFailure(_) => "conversion_failure",
            Error::Tool { .. } => "tool_error",
            Error::Io { .. } => "io_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();

        // The asset exists in these cases, so ranges are still advertised.
        if matches!(
            self.inner,
            Error::EmptyOrCorrupt(_) | Error::UnsupportedFormat { .. }
        ) {
            response
                .headers_mut()
                .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_produces_404_with_code() {
        let response = AppError::new(Error::not_found("asset", "clip.mp4")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["error"], "asset not found: clip.mp4");
    }

    #[test]
    fn unsupported_produces_415() {
        let response = AppError::new(Error::unsupported(Some("image/png"))).into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    }

    #[test]
    fn empty_produces_422() {
        let response = AppError::new(Error::EmptyOrCorrupt("zero bytes".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    }

    #[test]
    fn missing_asset_does_not_advertise_ranges() {
        let response = AppError::new(Error::not_found("asset", "gone.mp4")).into_response();
        assert!(response.headers().get(header::ACCEPT_RANGES).is_none());
    }

    #[test]
    fn conversion_failure_produces_502() {
        let response =
            AppError::new(Error::ConversionFailure("exhausted".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn invalid_range_produces_empty_416() {
        let response =
            AppError::new(Error::invalid_range(10_000, "start past end")).into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10000");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }
}
