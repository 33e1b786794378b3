//! The HTTP/2 engine: present, but gated.
//!
//! Per the current design (Open Question (a), recorded in DESIGN.md), the
//! HTTP/2 code path exists as a declared shape but is not wired up: the
//! connection factory panics if ALPN actually negotiates `h2`. These
//! constructors exist so the factory has something to call into that
//! documents *why* it's unsupported, rather than the factory hard-coding
//! the panic message itself.

/// Would construct a client-role HTTP/2 engine. Always panics: HTTP/2 is
/// not wired into the connection factory yet.
pub fn new_h2_client() -> ! {
    panic!("HTTP/2 is not yet supported by this connection factory (client)")
}

/// Would construct a server-role HTTP/2 engine. Always panics: HTTP/2 is
/// not wired into the connection factory yet.
pub fn new_h2_server() -> ! {
    panic!("HTTP/2 is not yet supported by this connection factory (server)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn new_h2_client_panics() {
        let result = panic::catch_unwind(new_h2_client);
        assert!(result.is_err());
    }

    #[test]
    fn new_h2_server_panics() {
        let result = panic::catch_unwind(new_h2_server);
        assert!(result.is_err());
    }
}
