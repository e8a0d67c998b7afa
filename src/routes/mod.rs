//! HTTP routes for Notewarden
//!
//! The server reads each request into an [`ApiRequest`] (head plus a capped
//! body) and offers it to the handlers in turn. A handler returns `None`
//! when the path is not one of its own.

pub mod auth_routes;
pub mod content;
pub mod courses;
pub mod health;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::types::{NotewardenError, Result};

pub use auth_routes::handle_auth_request;
pub use content::handle_content_request;
pub use courses::handle_course_request;
pub use health::health_check;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

// =============================================================================
// Request
// =============================================================================

/// A fully read request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub auth_header: Option<String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            auth_header: None,
            body: Bytes::new(),
        }
    }

    pub fn with_auth(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Bytes::from(serde_json::to_vec(body).unwrap_or_default());
        self
    }

    /// Read head and body, rejecting bodies over [`MAX_BODY_BYTES`]
    pub async fn read(req: Request<Incoming>) -> Result<Self> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let auth_header = req
            .headers()
            .get(hyper::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| NotewardenError::ValidationFailed(format!("Failed to read body: {}", e)))?
            .to_bytes();

        Ok(Self {
            method,
            path,
            auth_header,
            body,
        })
    }

    pub fn auth(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    /// Non-empty path segments
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Decode the JSON body; an empty body decodes as `{}`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"{}")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

// =============================================================================
// Response Helpers
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

fn internal_error_fallback() -> Response<BoxBody> {
    let mut response = Response::new(full_body(r#"{"error":"Internal server error"}"#));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = match serde_json::to_string(body) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            return internal_error_fallback();
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Cache-Control", "no-store")
        .body(full_body(json))
        .unwrap_or_else(|_| internal_error_fallback())
}

pub fn message_response(status: StatusCode, message: impl Into<String>) -> Response<BoxBody> {
    json_response(
        status,
        &MessageResponse {
            message: message.into(),
        },
    )
}

/// Map an error to its status and `{error, code}` body
///
/// Server-side faults are logged with detail and answered generically.
pub fn error_response(err: &NotewardenError) -> Response<BoxBody> {
    if err.is_server_fault() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.public_message(),
            code: err.code(),
        },
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: "METHOD_NOT_ALLOWED",
        },
    )
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {}", path),
            code: "NOT_FOUND",
        },
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap_or_else(|_| internal_error_fallback())
}

/// Collapse a handler result into a response
pub fn respond(result: Result<Response<BoxBody>>) -> Response<BoxBody> {
    result.unwrap_or_else(|e| error_response(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_ignore_slashes() {
        let req = ApiRequest::new(Method::GET, "/notes/abc/vote/");
        assert_eq!(req.segments(), vec!["notes", "abc", "vote"]);
        assert!(ApiRequest::new(Method::GET, "/").segments().is_empty());
    }

    #[test]
    fn test_empty_body_decodes_as_object() {
        #[derive(serde::Deserialize)]
        struct Body {
            name: Option<String>,
        }
        let req = ApiRequest::new(Method::POST, "/x");
        let body: Body = req.json().unwrap();
        assert!(body.name.is_none());

        let mut req = ApiRequest::new(Method::POST, "/x");
        req.body = Bytes::from_static(b"{not json");
        assert!(matches!(
            req.json::<Body>(),
            Err(NotewardenError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_error_response_hides_server_detail() {
        let response = error_response(&NotewardenError::RepositoryUnavailable(
            "connection refused at 10.0.0.3".into(),
        ));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = error_response(&NotewardenError::PermissionDenied);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_preflight() {
        let response = cors_preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["Access-Control-Allow-Methods"],
            ALLOWED_METHODS
        );
    }
}
