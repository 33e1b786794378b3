//! The abstract connection object (Component D).

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::channel::{Channel, SlotId};
use crate::error::Error;
use crate::proto::ProtocolEngine;
use crate::version::Version;

/// The fixed role tag a connection carries for its entire lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// A connection that issues requests.
    Client,
    /// A connection that receives requests.
    Server,
}

/// Callbacks a client connection carries.
#[derive(Default)]
pub struct ClientData {
    /// An optional hook to rewrite outgoing requests (e.g. for a proxy),
    /// copied onto the connection from `client_connect`'s options once
    /// setup succeeds (§4.7). `Mutex`-guarded rather than a plain field
    /// since it's populated after construction, not at it.
    proxy_request_transform: Mutex<Option<Box<dyn Fn(&mut crate::proto::RequestOptions) + Send + Sync>>>,
}

impl fmt::Debug for ClientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientData")
            .field(
                "proxy_request_transform",
                &self.proxy_request_transform.lock().unwrap().is_some(),
            )
            .finish()
    }
}

/// Callbacks a server connection carries. Exactly one of
/// [`ClientData`]/[`ServerData`] is populated on any given connection; the
/// presence of one vs. the other is how [`Connection::is_client`]/
/// [`Connection::is_server`] decide role.
pub struct ServerData {
    on_incoming_request: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
    on_shutdown: Mutex<Option<Box<dyn Fn(Option<Error>) + Send + Sync>>>,
}

impl fmt::Debug for ServerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerData")
            .field(
                "configured",
                &self.on_incoming_request.lock().unwrap().is_some(),
            )
            .finish()
    }
}

impl Default for ServerData {
    fn default() -> ServerData {
        ServerData {
            on_incoming_request: Mutex::new(None),
            on_shutdown: Mutex::new(None),
        }
    }
}

enum RoleData {
    Client(ClientData),
    Server(ServerData),
}

struct Inner {
    version: Version,
    channel: Arc<Channel>,
    slot: SlotId,
    engine: Arc<dyn ProtocolEngine>,
    role_data: RoleData,
    refcount: AtomicUsize,
    /// Opaque owner-supplied value (§3). Copied onto the connection from
    /// `client_connect`'s options once setup succeeds (§4.7); general to
    /// the connection rather than role-specific, hence living on `Inner`
    /// rather than inside `ClientData`/`ServerData`.
    user_data: Mutex<Option<Arc<dyn Any + Send + Sync>>>,
}

/// A role-tagged handle over a version-specific protocol engine, spliced
/// into a channel pipeline. Cheap to clone (an `Arc` underneath); the
/// explicit [`acquire`](Connection::acquire)/[`release`](Connection::release)
/// pair models a *second*, independent refcount — the "user" share,
/// distinct from however many `Connection` clones happen to exist in
/// Rust — so that the 1-\>0 transition the external contract cares about
/// can be detected exactly once regardless of how many `Arc` clones are
/// floating around internally. See DESIGN.md for why this isn't just
/// `Arc::strong_count`.
#[derive(Clone)]
pub struct Connection(Arc<Inner>);

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("role", &if self.is_client() { "client" } else { "server" })
            .field("version", &self.0.version)
            .field("refcount", &self.0.refcount.load(Ordering::SeqCst))
            .finish()
    }
}

impl Connection {
    pub(crate) fn new_client(
        version: Version,
        channel: Arc<Channel>,
        slot: SlotId,
        engine: Arc<dyn ProtocolEngine>,
    ) -> Connection {
        Connection(Arc::new(Inner {
            version,
            channel,
            slot,
            engine,
            role_data: RoleData::Client(ClientData::default()),
            refcount: AtomicUsize::new(1),
            user_data: Mutex::new(None),
        }))
    }

    pub(crate) fn new_server(
        version: Version,
        channel: Arc<Channel>,
        slot: SlotId,
        engine: Arc<dyn ProtocolEngine>,
    ) -> Connection {
        Connection(Arc::new(Inner {
            version,
            channel,
            slot,
            engine,
            role_data: RoleData::Server(ServerData::default()),
            refcount: AtomicUsize::new(1),
            user_data: Mutex::new(None),
        }))
    }

    /// Atomically increments the refcount.
    ///
    /// # Panics
    ///
    /// Panics (debug assertion) if the refcount was already zero — per
    /// the external contract, incrementing a released connection is
    /// undefined behavior and must not happen.
    pub fn acquire(&self) {
        let previous = self.0.refcount.fetch_add(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "acquire() on an already-released connection");
    }

    /// Atomically decrements the refcount. If the pre-decrement value was
    /// 1, initiates channel shutdown (harmless if already in progress) and
    /// releases this connection's hold on the channel. Physical
    /// destruction happens later, when the channel itself tears down its
    /// pipeline.
    pub fn release(&self) {
        let previous = self.0.refcount.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "double-release of a connection");
        if previous == 1 {
            self.0.channel.shutdown(None);
            self.0.channel.release_hold();
        }
    }

    /// Dispatches to the protocol engine's idempotent close.
    pub fn close(&self) {
        self.0.engine.close();
    }

    /// Dispatches to the protocol engine's open check.
    pub fn is_open(&self) -> bool {
        self.0.engine.is_open()
    }

    /// True iff this connection carries [`ClientData`].
    pub fn is_client(&self) -> bool {
        matches!(self.0.role_data, RoleData::Client(_))
    }

    /// True iff this connection carries [`ServerData`].
    pub fn is_server(&self) -> bool {
        matches!(self.0.role_data, RoleData::Server(_))
    }

    /// Returns the underlying channel.
    pub fn get_channel(&self) -> Arc<Channel> {
        self.0.channel.clone()
    }

    /// Dispatches to the protocol engine's window update.
    pub fn update_window(&self, increment: u32) {
        self.0.engine.update_window(increment);
    }

    /// Returns the immutable version tag negotiated at construction.
    pub fn get_version(&self) -> Version {
        self.0.version
    }

    /// Returns the opaque owner-supplied value set via `client_connect`'s
    /// options, if any (§3 `user_data`).
    pub fn user_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.0.user_data.lock().unwrap().clone()
    }

    /// Installs the opaque owner-supplied value on this connection. Called
    /// from `client_connect`'s setup path (§4.7); not exposed to the
    /// server accept path, which has no equivalent step in the contract.
    pub(crate) fn set_user_data(&self, user_data: Arc<dyn Any + Send + Sync>) {
        *self.0.user_data.lock().unwrap() = Some(user_data);
    }

    /// Installs the proxy request-rewrite hook on a client connection.
    /// Called from `client_connect`'s setup path (§4.7); a no-op on a
    /// server connection, since `client_connect` is the only caller and
    /// only ever builds client connections.
    pub(crate) fn set_proxy_request_transform(
        &self,
        hook: Box<dyn Fn(&mut crate::proto::RequestOptions) + Send + Sync>,
    ) {
        if let RoleData::Client(data) = &self.0.role_data {
            *data.proxy_request_transform.lock().unwrap() = Some(hook);
        }
    }

    /// Opens a new outgoing request stream (component C's
    /// `new_client_request_stream`), running the connection's proxy
    /// request-rewrite hook over `options` first, if one was installed.
    /// Fails with [`Kind::InvalidState`](crate::error::Kind::InvalidState)
    /// on a server connection.
    pub fn new_client_request(
        &self,
        mut options: crate::proto::RequestOptions,
    ) -> Result<crate::proto::StreamId, Error> {
        let data = match &self.0.role_data {
            RoleData::Client(data) => data,
            RoleData::Server(_) => return Err(Error::new_invalid_state()),
        };
        if let Some(hook) = data.proxy_request_transform.lock().unwrap().as_ref() {
            hook(&mut options);
        }
        self.0.engine.new_client_request_stream(options)
    }

    /// Returns the protocol engine, for the factory and role-specific
    /// request paths to dispatch through.
    pub(crate) fn engine(&self) -> &Arc<dyn ProtocolEngine> {
        &self.0.engine
    }

    /// The slot this connection's engine occupies in the channel pipeline.
    pub(crate) fn slot(&self) -> SlotId {
        self.0.slot
    }

    /// Installs `on_incoming_request`/`on_shutdown` on a server connection.
    /// Must be called synchronously from within the server's
    /// `on_incoming_connection` callback (§4.6); calling it later doesn't
    /// fail explicitly, but a server that sees no configuration by the
    /// time that callback returns treats the connection as misconfigured
    /// and closes it (see `server.rs`).
    pub fn configure_server<F, S>(&self, on_incoming_request: F, on_shutdown: S) -> Result<(), Error>
    where
        F: Fn() + Send + Sync + 'static,
        S: Fn(Option<Error>) + Send + Sync + 'static,
    {
        let server_data = match &self.0.role_data {
            RoleData::Server(data) => data,
            RoleData::Client(_) => return Err(Error::new_invalid_state()),
        };
        let mut configured = server_data.on_incoming_request.lock().unwrap();
        if configured.is_some() {
            return Err(Error::new_invalid_state());
        }
        *configured = Some(Box::new(on_incoming_request));
        *server_data.on_shutdown.lock().unwrap() = Some(Box::new(on_shutdown));
        Ok(())
    }

    /// True iff a server connection has had `configure_server` called.
    /// Always false for client connections.
    pub(crate) fn is_configured(&self) -> bool {
        match &self.0.role_data {
            RoleData::Server(data) => data.on_incoming_request.lock().unwrap().is_some(),
            RoleData::Client(_) => false,
        }
    }

    /// Invokes the configured per-connection shutdown callback, if any.
    pub(crate) fn fire_on_shutdown(&self, error: Option<Error>) {
        if let RoleData::Server(data) = &self.0.role_data {
            if let Some(cb) = data.on_shutdown.lock().unwrap().as_ref() {
                cb(error);
            }
        }
    }
}
