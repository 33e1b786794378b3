//! A minimal HTTP/1.1 engine.
//!
//! This is deliberately not a wire-format parser or encoder — that's out
//! of scope for this crate. It is the smallest state machine that
//! satisfies [`ProtocolEngine`] well enough to drive the connection
//! lifecycle and dispatch contracts this crate actually owns: opening
//! streams, reporting open/closed, and moving bytes a caller handed it
//! back out again, in order, per stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::channel::ChannelHandler;
use crate::connection::Role;
use crate::error::{Error, Kind};
use crate::proto::{ProtocolEngine, RequestOptions, StreamId};

struct StreamState {
    outgoing: Vec<u8>,
    incoming: Vec<u8>,
}

/// The HTTP/1.1 protocol engine.
pub struct Http1Engine {
    role: Role,
    open: AtomicBool,
    next_stream_id: AtomicU64,
    streams: Mutex<HashMap<StreamId, StreamState>>,
}

impl Http1Engine {
    fn new(role: Role) -> Http1Engine {
        Http1Engine {
            role,
            open: AtomicBool::new(true),
            next_stream_id: AtomicU64::new(1),
            streams: Mutex::new(HashMap::new()),
        }
    }

    fn new_stream(&self) -> StreamId {
        let id = StreamId(self.next_stream_id.fetch_add(1, Ordering::SeqCst));
        self.streams.lock().unwrap().insert(
            id,
            StreamState {
                outgoing: Vec::new(),
                incoming: Vec::new(),
            },
        );
        id
    }
}

/// Constructs a client-role HTTP/1.1 engine.
pub fn new_h1_1_client() -> Http1Engine {
    Http1Engine::new(Role::Client)
}

/// Constructs a server-role HTTP/1.1 engine.
pub fn new_h1_1_server() -> Http1Engine {
    Http1Engine::new(Role::Server)
}

impl ChannelHandler for Http1Engine {
    fn shutdown(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl ProtocolEngine for Http1Engine {
    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn update_window(&self, _increment: u32) {
        // HTTP/1.1 has no flow-control window; no-op by design.
    }

    fn new_client_request_stream(&self, _options: RequestOptions) -> Result<StreamId, Error> {
        if self.role != Role::Client {
            return Err(Error::new_invalid_state());
        }
        if !self.is_open() {
            return Err(Error::new_closed());
        }
        Ok(self.new_stream())
    }

    fn new_server_request_handler(&self, _options: RequestOptions) -> Result<StreamId, Error> {
        if self.role != Role::Server {
            return Err(Error::new_invalid_state());
        }
        if !self.is_open() {
            return Err(Error::new_closed());
        }
        Ok(self.new_stream())
    }

    fn stream_write_outgoing_data(&self, stream: StreamId, data: &[u8]) -> Result<(), Error> {
        let mut streams = self.streams.lock().unwrap();
        let state = streams
            .get_mut(&stream)
            .ok_or_else(|| Error::new(Kind::StreamClosed))?;
        state.outgoing.extend_from_slice(data);
        state.incoming.extend_from_slice(data);
        Ok(())
    }

    fn stream_read_incoming_data(&self, stream: StreamId) -> Result<bytes::Bytes, Error> {
        let mut streams = self.streams.lock().unwrap();
        let state = streams
            .get_mut(&stream)
            .ok_or_else(|| Error::new(Kind::StreamClosed))?;
        Ok(bytes::Bytes::from(std::mem::take(&mut state.incoming)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_stream_roundtrips_data() {
        let engine = new_h1_1_client();
        let stream = engine
            .new_client_request_stream(RequestOptions {
                method: http::Method::GET,
                path: "/".into(),
            })
            .unwrap();
        engine.stream_write_outgoing_data(stream, b"hello").unwrap();
        assert_eq!(
            engine.stream_read_incoming_data(stream).unwrap(),
            bytes::Bytes::from_static(b"hello")
        );
    }

    #[test]
    fn server_role_rejects_client_stream() {
        let engine = new_h1_1_server();
        let err = engine
            .new_client_request_stream(RequestOptions {
                method: http::Method::GET,
                path: "/".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), Kind::InvalidState);
    }

    #[test]
    fn close_marks_engine_not_open() {
        let engine = new_h1_1_client();
        assert!(engine.is_open());
        engine.close();
        assert!(!engine.is_open());
    }
}
