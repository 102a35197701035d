//! Query strings and MJPEG multipart framing.
//!
//! The stream is a `multipart/x-mixed-replace` body. Each part is
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <len>\r\n
//! \r\n
//! <jpeg bytes>\r\n
//! ```

/// Multipart boundary of the stream.
pub const BOUNDARY: &str = "frame";

/// Content type of the `/stream` response.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Extra headers sent with the `/stream` response.
pub const STREAM_HEADERS: [(&str, &str); 2] = [
    ("Access-Control-Allow-Origin", "*"),
    ("X-Framerate", "10"),
];

/// Sent after the JPEG bytes of every part.
pub const PART_TRAILER: &[u8] = b"\r\n";

/// Header block preceding a part of `len` JPEG bytes.
pub fn part_header(len: usize) -> String {
    format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY, len
    )
}

/// Split a request URI into path and query string.
pub fn split_uri(uri: &str) -> (&str, &str) {
    match uri.split_once('?') {
        Some((path, query)) => (path, query),
        None => (uri, ""),
    }
}

/// Value of `key` in a query string, percent-decoded.
///
/// The first occurrence wins. A key without `=` yields an empty value.
pub fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(k, _)| decode_component(k) == key)
        .map(|(_, v)| decode_component(v))
}

/// Form decoding: `+` is a space, invalid escapes are kept verbatim.
fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_header() {
        assert_eq!(
            part_header(1234),
            "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 1234\r\n\r\n"
        );
        assert!(STREAM_CONTENT_TYPE.ends_with(BOUNDARY));
    }

    #[test]
    fn test_split_uri() {
        assert_eq!(split_uri("/stream?quality=10"), ("/stream", "quality=10"));
        assert_eq!(split_uri("/status"), ("/status", ""));
    }

    #[test]
    fn test_query_param() {
        let query = "var=aec_value&val=450&t=1700000000";
        assert_eq!(query_param(query, "var").as_deref(), Some("aec_value"));
        assert_eq!(query_param(query, "val").as_deref(), Some("450"));
        assert_eq!(query_param(query, "missing"), None);
        assert_eq!(query_param("", "var"), None);
    }

    #[test]
    fn test_query_param_first_wins_and_empty() {
        assert_eq!(query_param("a=1&a=2", "a").as_deref(), Some("1"));
        assert_eq!(query_param("flag&x=1", "flag").as_deref(), Some(""));
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(query_param("val=%2D2", "val").as_deref(), Some("-2"));
        assert_eq!(query_param("v=a+b", "v").as_deref(), Some("a b"));
        assert_eq!(query_param("v=100%", "v").as_deref(), Some("100%"));
        assert_eq!(query_param("v=%zz", "v").as_deref(), Some("%zz"));
        assert_eq!(query_param("v=%2B1", "v").as_deref(), Some("+1"));
        assert_eq!(query_param("q%75ality=7", "quality").as_deref(), Some("7"));
    }
}
