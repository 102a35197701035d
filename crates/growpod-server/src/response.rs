//! Framework-neutral HTTP response.

use growpod_protocol::routes::{CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
use std::borrow::Cow;

/// A complete response for one of the non-streaming routes.
///
/// Adapters translate it into `EspHttpServer` or axum responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<&'static str>,
    /// Headers besides `Content-Type`.
    pub headers: Vec<(&'static str, String)>,
    pub body: Cow<'static, [u8]>,
}

impl Response {
    pub fn new(status: u16, content_type: Option<&'static str>, body: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn html(page: &'static str) -> Self {
        Self::new(200, Some(CONTENT_TYPE_HTML), page.as_bytes())
    }

    pub fn json(body: String) -> Self {
        Self::new(200, Some(CONTENT_TYPE_JSON), body.into_bytes())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, Some(CONTENT_TYPE_TEXT), body.into().into_bytes())
    }

    /// `200 OK` with body "OK".
    pub fn ok() -> Self {
        Self::text(200, "OK")
    }

    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self::new(204, None, Vec::new())
    }

    pub fn not_found(body: impl Into<String>) -> Self {
        Self::text(404, body)
    }

    pub fn internal_error(body: impl Into<String>) -> Self {
        Self::text(500, body)
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Reason phrase for the status line.
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }

    /// Body as UTF-8, if it is text.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Reason phrase for the status codes the camera emits.
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let ok = Response::ok();
        assert_eq!(ok.status, 200);
        assert_eq!(ok.content_type, Some("text/plain"));
        assert_eq!(ok.body_str(), Some("OK"));

        let empty = Response::no_content();
        assert_eq!(empty.status, 204);
        assert!(empty.body.is_empty());
        assert_eq!(empty.reason(), "No Content");

        let err = Response::internal_error("Failed to capture image").with_header("Retry-After", "1");
        assert_eq!(err.reason(), "Internal Server Error");
        assert_eq!(err.headers, vec![("Retry-After", "1".to_string())]);
    }
}
