//! Protocol-handler vtable (Component C) and version-specific engines.
//!
//! Every version/role combination this crate supports constructs a type
//! implementing [`ProtocolEngine`] and embeds it into the channel pipeline
//! as a [`ChannelHandler`]. The connection and factory only ever go
//! through this trait; they never know whether they're driving an
//! HTTP/1.1 state machine or (once built) an HTTP/2 one.
//!
//! Byte-level parsing and encoding are out of scope for this crate (see
//! the crate docs); [`h1::Http1Engine`] is therefore a thin state machine
//! with in-memory read/write queues, not a wire-format implementation.

use std::fmt;

use crate::channel::ChannelHandler;
use crate::error::Error;

cfg_http1! {
    pub mod h1;
}

cfg_http2! {
    pub mod h2;
}

/// Opaque handle to a request/response exchange on a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(pub(crate) u64);

/// Minimal request-issuance options. Real header/body construction lives
/// above this layer; the core only needs enough to identify the request
/// for dispatch purposes.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// The request method.
    pub method: http::Method,
    /// The request path.
    pub path: String,
}

/// The capability set every version-specific protocol engine must
/// implement (§4.3). Also a [`ChannelHandler`], since the same object
/// plugs directly into the channel pipeline.
pub trait ProtocolEngine: ChannelHandler {
    /// Idempotently initiates a protocol-level close.
    fn close(&self);

    /// Whether the engine still considers itself open.
    fn is_open(&self) -> bool;

    /// Adjusts the receive flow-control window by a non-negative
    /// increment. A no-op for versions without flow control.
    fn update_window(&self, increment: u32);

    /// Opens a new outgoing request stream. Client engines only.
    fn new_client_request_stream(&self, options: RequestOptions) -> Result<StreamId, Error>;

    /// Registers a handler for inbound requests. Server engines only.
    fn new_server_request_handler(&self, options: RequestOptions) -> Result<StreamId, Error>;

    /// Writes outgoing data on an already-created stream.
    fn stream_write_outgoing_data(&self, stream: StreamId, data: &[u8]) -> Result<(), Error>;

    /// Reads incoming data from an already-created stream.
    fn stream_read_incoming_data(&self, stream: StreamId) -> Result<bytes::Bytes, Error>;
}

impl fmt::Debug for dyn ProtocolEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn ProtocolEngine")
    }
}
