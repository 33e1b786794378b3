//! Socket and TLS bootstrap (consumed interface, §6.1).
//!
//! The real socket/TLS bootstrap is, per scope, an external collaborator:
//! this crate never owns a socket or speaks TLS itself. What it does own
//! is the *shape* of that collaboration — the [`ClientBootstrap`] and
//! [`ServerBootstrap`] traits below — plus two implementations: a
//! `tokio`-backed one good enough to actually open TCP connections and
//! listeners (behind the `tcp` feature), and an in-memory [`loopback`] one
//! that synthesizes channels and ALPN state for tests without touching a
//! socket at all.

use std::sync::Arc;

use crate::channel::Channel;
use crate::error::Error;

/// Called exactly once per connect attempt, with either a ready channel
/// and no error, or no channel and an error — never both, never neither.
pub type SetupCallback = Box<dyn FnOnce(Option<Arc<Channel>>, Option<Error>) + Send>;

/// Called exactly once, after a channel that completed setup finishes
/// shutting down.
pub type ShutdownCallback = Box<dyn FnOnce(Option<Error>) + Send>;

/// Called once per inbound channel, analogous to [`SetupCallback`] but
/// shared across every accepted connection for the listener's lifetime.
pub type AcceptSetupCallback = Box<dyn Fn(Option<Arc<Channel>>, Option<Error>) + Send + Sync>;

/// Called once per accepted channel, after that channel's shutdown
/// completes.
pub type AcceptShutdownCallback = Box<dyn Fn(Arc<Channel>, Option<Error>) + Send + Sync>;

/// Called once, after every accepted channel has shut down and the
/// listening socket itself has been torn down.
pub type ListenerDestroyCallback = Box<dyn FnOnce() + Send>;

/// Host/port and socket options for an outbound connection attempt.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// The host to connect to.
    pub host: String,
    /// The port to connect to.
    pub port: u16,
}

/// The client-side half of the bootstrap contract (§6.1).
pub trait ClientBootstrap: Send + Sync {
    /// Opens a plaintext socket channel.
    fn new_socket_channel(
        &self,
        options: ConnectOptions,
        on_setup: SetupCallback,
        on_shutdown: ShutdownCallback,
    );

    /// Opens a TLS socket channel. ALPN negotiation, if any, becomes
    /// visible to the factory via [`Channel::adj_left_alpn_protocol`].
    fn new_tls_socket_channel(
        &self,
        options: ConnectOptions,
        on_setup: SetupCallback,
        on_shutdown: ShutdownCallback,
    );
}

/// A listening socket handle, torn down by dropping it through
/// [`ListeningSocket::destroy`].
pub trait ListeningSocket: Send + Sync {
    /// Tears down the listening socket. Must eventually invoke the
    /// listener's `on_listener_destroy` callback (supplied when the
    /// listener was created) once no further accept-setup calls will
    /// occur.
    fn destroy(self: Box<Self>);
}

/// The server-side half of the bootstrap contract (§6.1).
pub trait ServerBootstrap: Send + Sync {
    /// Creates a plaintext listening socket on `port`.
    fn new_socket_listener(
        &self,
        port: u16,
        on_accept_setup: AcceptSetupCallback,
        on_accept_shutdown: AcceptShutdownCallback,
        on_listener_destroy: ListenerDestroyCallback,
    ) -> Result<Box<dyn ListeningSocket>, Error>;

    /// Creates a TLS listening socket on `port`.
    fn new_tls_socket_listener(
        &self,
        port: u16,
        on_accept_setup: AcceptSetupCallback,
        on_accept_shutdown: AcceptShutdownCallback,
        on_listener_destroy: ListenerDestroyCallback,
    ) -> Result<Box<dyn ListeningSocket>, Error>;
}

/// Returns the default system vtable: the `tokio`-backed bootstrap when
/// the `tcp` feature is enabled, or the in-memory [`loopback`] bootstrap
/// otherwise (there is no other "real" bootstrap this crate can default
/// to without a socket implementation compiled in).
pub(crate) fn default_vtable() -> impl crate::system::SystemVtable {
    #[cfg(feature = "tcp")]
    {
        tcp::TcpVtable::new()
    }
    #[cfg(not(feature = "tcp"))]
    {
        loopback::LoopbackVtable::new()
    }
}

#[cfg(feature = "tcp")]
#[cfg_attr(docsrs, doc(cfg(feature = "tcp")))]
pub mod tcp;

pub mod loopback;
