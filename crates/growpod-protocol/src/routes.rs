//! Route table.

/// `text/html` pages.
pub const CONTENT_TYPE_HTML: &str = "text/html";
/// `/status` document.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Plain-text acknowledgements and error bodies.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
/// Still captures and stream parts.
pub const CONTENT_TYPE_JPEG: &str = "image/jpeg";

/// Every path the camera serves. All are `GET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Preview,
    Settings,
    Stream,
    Capture,
    Status,
    Control,
    Favicon,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Home,
        Route::Preview,
        Route::Settings,
        Route::Stream,
        Route::Capture,
        Route::Status,
        Route::Control,
        Route::Favicon,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Preview => "/preview",
            Route::Settings => "/settings",
            Route::Stream => "/stream",
            Route::Capture => "/capture",
            Route::Status => "/status",
            Route::Control => "/control",
            Route::Favicon => "/favicon.ico",
        }
    }

    /// Match a request path (without query string).
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths_unique() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/stream?quality=3"), None);
        assert_eq!(Route::from_path("/nope"), None);
    }
}
