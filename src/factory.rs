//! The connection factory (Component E).
//!
//! Turns a freshly set-up channel into a typed [`Connection`], picking a
//! protocol version from ALPN state (if any) and splicing the
//! version-specific engine into the channel pipeline.

use std::sync::Arc;

use crate::channel::Channel;
use crate::connection::{Connection, Role};
use crate::error::Error;
use crate::proto::ProtocolEngine;
use crate::version::Version;

struct EngineHandler(Arc<dyn ProtocolEngine>);

impl crate::channel::ChannelHandler for EngineHandler {
    fn shutdown(&self) {
        self.0.shutdown()
    }

    fn alpn_protocol(&self) -> Option<Vec<u8>> {
        self.0.alpn_protocol()
    }
}

/// Inputs to [`new_connection`].
pub struct NewConnectionOptions {
    /// The freshly set-up channel to splice a handler into.
    pub channel: Arc<Channel>,
    /// Whether this connection is a client or a server connection.
    pub role: Role,
    /// Whether the channel has a TLS handler installed upstream.
    pub is_using_tls: bool,
}

/// Builds a new connection on `options.channel` (§4.5).
///
/// # Panics
///
/// Panics if ALPN negotiates HTTP/2: the HTTP/2 engine exists but is not
/// wired into this factory yet (documented current behavior, see
/// DESIGN.md's Open Question (a)).
pub fn new_connection(options: NewConnectionOptions) -> Result<Connection, Error> {
    let NewConnectionOptions {
        channel,
        role,
        is_using_tls,
    } = options;

    // Step 1: allocate a slot and append it to the end of the pipeline.
    let slot = channel.slot_insert_end();

    // From here on, any failure must remove the slot before returning.
    match build(&channel, slot, role, is_using_tls) {
        Ok(connection) => Ok(connection),
        Err(err) => {
            channel.slot_remove(slot);
            Err(err)
        }
    }
}

fn build(
    channel: &Arc<Channel>,
    slot: crate::channel::SlotId,
    role: Role,
    is_using_tls: bool,
) -> Result<Connection, Error> {
    // Step 2: determine version.
    let version = if !is_using_tls {
        Version::Http11
    } else {
        let negotiated = channel.adj_left_alpn_protocol(slot).unwrap_or_default();
        Version::from_alpn(&negotiated)
    };

    // Step 3: construct the role- and version-specific engine. HTTP/2 is
    // gated: constructing it panics rather than returning an engine.
    let engine: Arc<dyn ProtocolEngine> = match (version, role) {
        (Version::Http2, Role::Client) => {
            #[cfg(feature = "http2")]
            {
                crate::proto::h2::new_h2_client()
            }
            #[cfg(not(feature = "http2"))]
            {
                panic!("HTTP/2 is not yet supported by this connection factory (client)")
            }
        }
        (Version::Http2, Role::Server) => {
            #[cfg(feature = "http2")]
            {
                crate::proto::h2::new_h2_server()
            }
            #[cfg(not(feature = "http2"))]
            {
                panic!("HTTP/2 is not yet supported by this connection factory (server)")
            }
        }
        (_, Role::Client) => {
            #[cfg(feature = "http1")]
            {
                Arc::new(crate::proto::h1::new_h1_1_client())
            }
            #[cfg(not(feature = "http1"))]
            {
                panic!("HTTP/1.1 support requires the \"http1\" feature")
            }
        }
        (_, Role::Server) => {
            #[cfg(feature = "http1")]
            {
                Arc::new(crate::proto::h1::new_h1_1_server())
            }
            #[cfg(not(feature = "http1"))]
            {
                panic!("HTTP/1.1 support requires the \"http1\" feature")
            }
        }
    };

    // Step 4: bind the engine's channel handler into the slot. `Arc<dyn
    // ProtocolEngine>` can't unsize directly to `Box<dyn ChannelHandler>`,
    // so wrap it in a thin forwarding handler instead.
    channel.slot_set_handler(slot, Box::new(EngineHandler(Arc::clone(&engine))));

    // Step 5 + 7: the connection records its own slot back-pointer and
    // starts at refcount 1.
    let connection = match role {
        Role::Client => Connection::new_client(version, Arc::clone(channel), slot, engine),
        Role::Server => Connection::new_server(version, Arc::clone(channel), slot, engine),
    };

    // Step 6: acquire a hold on the channel so it outlives the user's
    // reference even if the channel's owner releases it.
    channel.acquire_hold();

    Ok(connection)
}
