//! Buffered response sink.
//!
//! # Responsibilities
//! - Collect what node handlers produce (status, headers, body)
//! - Convert the result into an axum `Response` once dispatch is over
//!
//! # Design Decisions
//! - Handlers run on a blocking thread, so the body is buffered, not streamed
//! - `log()` goes to tracing, tagged with the request id

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::dispatch::context::ResponseSink;

/// Response assembled by node handlers during dispatch.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    request_id: String,
    status: StatusCode,
    content_type: Option<String>,
    location: Option<String>,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: StatusCode::OK,
            content_type: None,
            location: None,
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, for diagnostics and tests.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new("unknown")
    }
}

impl ResponseSink for BufferedResponse {
    fn signal_not_found(&mut self) {
        self.status = StatusCode::NOT_FOUND;
    }

    fn log(&mut self, message: &str) {
        tracing::info!(request_id = %self.request_id, "{}", message);
    }

    fn redirect(&mut self, url: &str) {
        self.status = StatusCode::FOUND;
        self.location = Some(url.to_string());
    }

    fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn set_status(&mut self, status: u16) {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        if let Some(value) = self.content_type.and_then(|v| HeaderValue::from_str(&v).ok()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Some(location) = self.location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    headers.insert(header::LOCATION, value);
                }
                Err(_) => {
                    tracing::warn!(location = %location, "Dropping invalid redirect location");
                }
            }
        }
        response
    }
}
