//! Standard HTTP reason phrases.

pub use http::StatusCode;

/// Returns the standard reason phrase for `code`, or an empty string if
/// `code` is not a recognized status code.
///
/// ```
/// assert_eq!(http_core::status::status_text(404), "Not Found");
/// assert_eq!(http_core::status::status_text(9999), "");
/// ```
pub fn status_text(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}
