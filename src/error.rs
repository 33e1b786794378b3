//! Error and Result module.
//!
//! The public surface is an idiomatic `Result<T, Error>`; every fallible
//! operation in this crate returns one. Alongside that, and purely for
//! parity with callers written against the C library this crate's contract
//! was distilled from, every `Error` construction also populates a
//! thread-local "last error" slot (see [`last_error`] / [`take_last_error`]).
//! Nothing in this crate reads that slot to make decisions; it exists so
//! that call sites which only have a `bool`/`Option` to return (the byte
//! cursor helpers in [`crate::strutil`], for instance) can still let a
//! caller recover the underlying `Kind` if they want it.

use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Result type returned from fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

thread_local! {
    static LAST_ERROR: RefCell<Option<Kind>> = const { RefCell::new(None) };
}

/// Returns the `Kind` of the most recent `Error` constructed on this thread,
/// without clearing it.
pub fn last_error() -> Option<Kind> {
    LAST_ERROR.with(|cell| cell.borrow().clone())
}

/// Returns and clears the `Kind` of the most recent `Error` constructed on
/// this thread.
pub fn take_last_error() -> Option<Kind> {
    LAST_ERROR.with(|cell| cell.borrow_mut().take())
}

/// An error produced by this crate.
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
}

/// The closed set of error kinds this crate can produce.
///
/// Named kinds up through [`Kind::InvalidFrameSize`] mirror the HTTP error
/// range reserved by the connection core's external contract; most of them
/// are not yet raised by any operation in this crate (they belong to
/// sibling layers — websockets, the connection manager, proxying — that
/// consume this crate's `Connection` but are not implemented here) and are
/// kept as a closed, documented vocabulary rather than a numeric range so
/// that downstream `match`es stay exhaustive as those layers are built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Kind {
    /// Catch-all for a condition with no more specific kind.
    Unknown,
    /// A lookup for a header that is not present.
    HeaderNotFound,
    /// A header field name failed validation.
    InvalidHeaderName,
    /// A header field value failed validation.
    InvalidHeaderValue,
    /// Some part of a header failed validation without distinguishing name from value.
    InvalidHeaderField,
    /// A request method failed validation.
    InvalidMethod,
    /// A request path failed validation.
    InvalidPath,
    /// A response status code is out of range or malformed.
    InvalidStatusCode,
    /// An operation required a body stream that was not supplied.
    MissingBodyStream,
    /// A supplied body stream is unusable.
    InvalidBodyStream,
    /// The operation cannot proceed because the connection is closed.
    ConnectionClosed,
    /// The connection has switched application protocols (e.g. an upgrade).
    SwitchedProtocols,
    /// The negotiated or requested protocol is not supported by this build.
    UnsupportedProtocol,
    /// A caller was required to take an action synchronously and did not.
    ReactionRequired,
    /// Data was requested before it became available.
    DataNotAvailable,
    /// An outgoing stream declared a length that did not match the data written.
    OutgoingStreamLengthIncorrect,
    /// A user-supplied callback returned failure.
    CallbackFailure,
    /// A websocket upgrade handshake failed.
    WebsocketUpgradeFailure,
    /// A websocket close frame has already been sent.
    WebsocketCloseFrameSent,
    /// An operation is invalid because the handler is a mid-channel websocket handler.
    WebsocketIsMidchannelHandler,
    /// A connection manager acquire was attempted from an invalid state.
    ConnectionManagerInvalidStateForAcquire,
    /// More connections were released back to a connection manager than were vended.
    ConnectionManagerVendedConnectionUnderflow,
    /// The server has been closed and no longer accepts operations.
    ServerClosed,
    /// A TLS CONNECT through a proxy failed.
    ProxyTlsConnectFailed,
    /// A connection manager is shutting down and cannot vend connections.
    ConnectionManagerShuttingDown,
    /// A lower-level protocol violation was detected.
    ProtocolError,
    /// An operation was attempted on an already-closed stream.
    StreamClosed,
    /// A frame declared an invalid size.
    InvalidFrameSize,

    /// A caller supplied an invalid or missing argument.
    InvalidArgument,
    /// An operation was attempted while the connection or server was in a state that forbids it.
    InvalidState,
    /// An unsigned-integer parse overflowed `u64`.
    OverflowDetected,
    /// An `io::Error` occurred on the underlying channel.
    Io,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Returns true if this is an [`Kind::InvalidArgument`] or [`Kind::InvalidState`] error.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidArgument | Kind::InvalidState)
    }

    /// Returns true if this error means the connection is closed or closing.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::ConnectionClosed | Kind::ServerClosed | Kind::StreamClosed
        )
    }

    /// Consumes the error, returning its cause, if any.
    pub fn into_cause(self) -> Option<Cause> {
        self.inner.cause
    }

    pub(crate) fn new(kind: Kind) -> Error {
        LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(kind));
        Error {
            inner: Box::new(ErrorImpl { kind, cause: None }),
        }
    }

    pub(crate) fn with<C: Into<Cause>>(mut self, cause: C) -> Error {
        self.inner.cause = Some(cause.into());
        self
    }

    pub(crate) fn new_invalid_argument() -> Error {
        Error::new(Kind::InvalidArgument)
    }

    pub(crate) fn new_invalid_state() -> Error {
        Error::new(Kind::InvalidState)
    }

    pub(crate) fn new_overflow() -> Error {
        Error::new(Kind::OverflowDetected)
    }

    pub(crate) fn new_io(cause: io::Error) -> Error {
        Error::new(Kind::Io).with(cause)
    }

    pub(crate) fn new_closed() -> Error {
        Error::new(Kind::ConnectionClosed)
    }

    pub(crate) fn new_reaction_required() -> Error {
        Error::new(Kind::ReactionRequired)
    }

    pub(crate) fn new_unsupported_protocol() -> Error {
        Error::new(Kind::UnsupportedProtocol)
    }

    fn description(&self) -> &'static str {
        match self.inner.kind {
            Kind::Unknown => "unknown error",
            Kind::HeaderNotFound => "header not found",
            Kind::InvalidHeaderName => "invalid header name",
            Kind::InvalidHeaderValue => "invalid header value",
            Kind::InvalidHeaderField => "invalid header field",
            Kind::InvalidMethod => "invalid method",
            Kind::InvalidPath => "invalid path",
            Kind::InvalidStatusCode => "invalid status code",
            Kind::MissingBodyStream => "missing body stream",
            Kind::InvalidBodyStream => "invalid body stream",
            Kind::ConnectionClosed => "connection closed",
            Kind::SwitchedProtocols => "connection switched protocols",
            Kind::UnsupportedProtocol => "unsupported protocol",
            Kind::ReactionRequired => "caller failed to react synchronously as required",
            Kind::DataNotAvailable => "data not available",
            Kind::OutgoingStreamLengthIncorrect => "outgoing stream length incorrect",
            Kind::CallbackFailure => "callback failure",
            Kind::WebsocketUpgradeFailure => "websocket upgrade failure",
            Kind::WebsocketCloseFrameSent => "websocket close frame already sent",
            Kind::WebsocketIsMidchannelHandler => "handler is a mid-channel websocket handler",
            Kind::ConnectionManagerInvalidStateForAcquire => {
                "connection manager invalid state for acquire"
            }
            Kind::ConnectionManagerVendedConnectionUnderflow => {
                "connection manager vended connection underflow"
            }
            Kind::ServerClosed => "server closed",
            Kind::ProxyTlsConnectFailed => "proxy TLS connect failed",
            Kind::ConnectionManagerShuttingDown => "connection manager shutting down",
            Kind::ProtocolError => "protocol error",
            Kind::StreamClosed => "stream closed",
            Kind::InvalidFrameSize => "invalid frame size",
            Kind::InvalidArgument => "invalid argument",
            Kind::InvalidState => "invalid state",
            Kind::OverflowDetected => "overflow detected",
            Kind::Io => "connection I/O error",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_tuple("Error");
        f.field(&self.inner.kind);
        if let Some(ref cause) = self.inner.cause {
            f.field(cause);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref cause) = self.inner.cause {
            write!(f, "{}: {}", self.description(), cause)
        } else {
            f.write_str(self.description())
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::new_io(err)
    }
}

#[doc(hidden)]
trait AssertSendSync: Send + Sync + 'static {}
#[doc(hidden)]
impl AssertSendSync for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_is_stable_per_kind() {
        assert_eq!(Error::new_invalid_argument().to_string(), "invalid argument");
        assert_eq!(Error::new_overflow().to_string(), "overflow detected");
    }

    #[test]
    fn last_error_tracks_most_recent_construction() {
        take_last_error();
        assert_eq!(last_error(), None);
        let _ = Error::new(Kind::HeaderNotFound);
        assert_eq!(last_error(), Some(Kind::HeaderNotFound));
        let _ = Error::new_invalid_state();
        assert_eq!(take_last_error(), Some(Kind::InvalidState));
        assert_eq!(take_last_error(), None);
    }

    #[test]
    fn with_cause_is_chained_via_source() {
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let err = Error::new_io(io_err);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "connection I/O error: boom");
    }
}
