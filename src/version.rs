//! The HTTP version tag (Component B).

use std::fmt;

/// HTTP protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Version {
    /// Version is not yet known (no connection has negotiated one).
    Unknown,
    /// `HTTP/1.0`
    Http10,
    /// `HTTP/1.1`
    Http11,
    /// `HTTP/2`
    Http2,
}

impl Version {
    /// Maps a negotiated ALPN protocol identifier to a `Version`.
    ///
    /// `"http/1.1"` maps to [`Version::Http11`], `"h2"` maps to
    /// [`Version::Http2`]. An empty protocol identifier (no ALPN
    /// negotiated, or a plaintext connection) also maps to
    /// [`Version::Http11`]. Any other, non-empty identifier is
    /// unrecognized: it logs a warning and is treated as
    /// [`Version::Http11`], matching the permissive default a TLS
    /// connection falls back to when its peer advertises a protocol this
    /// crate doesn't know about.
    pub fn from_alpn(protocol: &[u8]) -> Version {
        match protocol {
            b"" => Version::Http11,
            b"http/1.1" => Version::Http11,
            b"h2" => Version::Http2,
            other => {
                warn!(
                    target: crate::trace::subject::CONNECTION,
                    protocol = %String::from_utf8_lossy(other),
                    "unrecognized ALPN protocol, defaulting to HTTP/1.1"
                );
                Version::Http11
            }
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Version::Unknown => "HTTP/unknown",
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
            Version::Http2 => "HTTP/2",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpn_http11() {
        assert_eq!(Version::from_alpn(b"http/1.1"), Version::Http11);
    }

    #[test]
    fn alpn_h2() {
        assert_eq!(Version::from_alpn(b"h2"), Version::Http2);
    }

    #[test]
    fn alpn_empty_defaults_to_http11() {
        assert_eq!(Version::from_alpn(b""), Version::Http11);
    }

    #[test]
    fn alpn_unrecognized_defaults_to_http11() {
        assert_eq!(Version::from_alpn(b"spdy/3"), Version::Http11);
    }

    #[test]
    fn display() {
        assert_eq!(Version::Http11.to_string(), "HTTP/1.1");
        assert_eq!(Version::Http2.to_string(), "HTTP/2");
    }
}
