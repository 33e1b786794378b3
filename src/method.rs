//! Exported method-name byte views.
//!
//! Re-exports [`http::Method`] for convenience and supplies the byte-view
//! constants the external contract names, for callers that work against
//! raw request-line bytes rather than the typed `http` crate.

pub use http::Method;

/// `GET`
pub const GET: &[u8] = b"GET";
/// `HEAD`
pub const HEAD: &[u8] = b"HEAD";
/// `POST`
pub const POST: &[u8] = b"POST";
/// `PUT`
pub const PUT: &[u8] = b"PUT";
/// `DELETE`
pub const DELETE: &[u8] = b"DELETE";
/// `CONNECT`
pub const CONNECT: &[u8] = b"CONNECT";
/// `OPTIONS`
pub const OPTIONS: &[u8] = b"OPTIONS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_views_match_method_as_str() {
        assert_eq!(GET, Method::GET.as_str().as_bytes());
        assert_eq!(HEAD, Method::HEAD.as_str().as_bytes());
        assert_eq!(POST, Method::POST.as_str().as_bytes());
        assert_eq!(PUT, Method::PUT.as_str().as_bytes());
        assert_eq!(DELETE, Method::DELETE.as_str().as_bytes());
        assert_eq!(CONNECT, Method::CONNECT.as_str().as_bytes());
        assert_eq!(OPTIONS, Method::OPTIONS.as_str().as_bytes());
    }
}
