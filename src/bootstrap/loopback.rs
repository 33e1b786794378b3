//! An in-memory bootstrap used by tests (and as the crate's fallback
//! default when the `tcp` feature is disabled).
//!
//! Every connect attempt and every accept is driven synchronously and
//! deterministically by a small script installed ahead of time, so tests
//! can assert on exact callback ordering without timing-dependent real
//! I/O.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::bootstrap::{
    AcceptSetupCallback, AcceptShutdownCallback, ClientBootstrap, ConnectOptions,
    ListenerDestroyCallback, ListeningSocket, ServerBootstrap, SetupCallback, ShutdownCallback,
};
use crate::channel::{Channel, ChannelHandler};
use crate::error::Error;
use crate::system::SystemVtable;

/// A scripted outcome for the next `new_socket_channel`/
/// `new_tls_socket_channel` call.
#[derive(Clone)]
pub enum ConnectOutcome {
    /// Setup succeeds with a fresh channel. If `alpn_protocol` is set, a
    /// stub TLS handler reporting that protocol is installed as the first
    /// slot, so the factory's ALPN lookup sees it.
    Setup {
        /// ALPN protocol the synthesized TLS slot should report, if any.
        alpn_protocol: Option<&'static [u8]>,
    },
    /// Setup fails outright with the given error; no channel is created
    /// and no shutdown callback will ever fire.
    SetupFailure(fn() -> Error),
}

struct TlsStub(Vec<u8>);
impl ChannelHandler for TlsStub {
    fn alpn_protocol(&self) -> Option<Vec<u8>> {
        Some(self.0.clone())
    }
}

/// The in-memory client bootstrap. Configure it with [`push_outcome`] (or
/// [`push_setup`]/[`push_setup_failure`]) before calling `client_connect`;
/// each call consumes one scripted outcome, FIFO.
#[derive(Default)]
pub struct LoopbackClientBootstrap {
    script: Mutex<VecDeque<ConnectOutcome>>,
}

impl LoopbackClientBootstrap {
    /// Creates an empty, unscripted bootstrap.
    pub fn new() -> Arc<LoopbackClientBootstrap> {
        Arc::new(LoopbackClientBootstrap::default())
    }

    /// Appends a scripted outcome for a future connect call.
    pub fn push_outcome(&self, outcome: ConnectOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Convenience for [`ConnectOutcome::Setup`].
    pub fn push_setup(&self, alpn_protocol: Option<&'static [u8]>) {
        self.push_outcome(ConnectOutcome::Setup { alpn_protocol });
    }

    /// Convenience for [`ConnectOutcome::SetupFailure`].
    pub fn push_setup_failure(&self, error: fn() -> Error) {
        self.push_outcome(ConnectOutcome::SetupFailure(error));
    }

    fn run(&self, on_setup: SetupCallback, on_shutdown: ShutdownCallback) {
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectOutcome::Setup {
                alpn_protocol: None,
            });
        match outcome {
            ConnectOutcome::Setup { alpn_protocol } => {
                let channel = Arc::new(Channel::new());
                if let Some(protocol) = alpn_protocol {
                    let slot = channel.slot_insert_end();
                    channel.slot_set_handler(slot, Box::new(TlsStub(protocol.to_vec())));
                }
                channel.on_shutdown(on_shutdown);
                on_setup(Some(channel), None);
            }
            ConnectOutcome::SetupFailure(make_err) => {
                on_setup(None, Some(make_err()));
            }
        }
    }
}

impl ClientBootstrap for LoopbackClientBootstrap {
    fn new_socket_channel(
        &self,
        _options: ConnectOptions,
        on_setup: SetupCallback,
        on_shutdown: ShutdownCallback,
    ) {
        self.run(on_setup, on_shutdown)
    }

    fn new_tls_socket_channel(
        &self,
        _options: ConnectOptions,
        on_setup: SetupCallback,
        on_shutdown: ShutdownCallback,
    ) {
        self.run(on_setup, on_shutdown)
    }
}

struct LoopbackListeningSocket {
    on_listener_destroy: Mutex<Option<ListenerDestroyCallback>>,
}

impl ListeningSocket for LoopbackListeningSocket {
    fn destroy(self: Box<Self>) {
        if let Some(cb) = self.on_listener_destroy.lock().unwrap().take() {
            cb();
        }
    }
}

/// The in-memory server bootstrap. [`accept`](LoopbackServerBootstrap::accept)
/// synthesizes one inbound channel per call and drives the accept-setup
/// callback synchronously.
#[derive(Default)]
pub struct LoopbackServerBootstrap {
    accept_setup: Mutex<Option<AcceptSetupCallback>>,
    accept_shutdown: Mutex<Option<Arc<AcceptShutdownCallback>>>,
}

impl LoopbackServerBootstrap {
    /// Creates a bootstrap with no listener registered yet.
    pub fn new() -> Arc<LoopbackServerBootstrap> {
        Arc::new(LoopbackServerBootstrap::default())
    }

    /// Synthesizes one inbound channel and runs the registered
    /// accept-setup callback with it. The channel's shutdown is wired to
    /// the registered accept-shutdown callback, so a test can drive the
    /// full accept -> shutdown lifecycle just by calling
    /// `Channel::shutdown` (or by going through `Server::release`).
    /// Returns the channel so the caller can do exactly that.
    pub fn accept(&self) -> Arc<Channel> {
        let channel = Arc::new(Channel::new());
        if let Some(cb) = self.accept_shutdown.lock().unwrap().as_ref() {
            let cb = cb.clone();
            let channel_for_cb = channel.clone();
            channel.on_shutdown(move |err| cb(channel_for_cb, err));
        }
        let guard = self.accept_setup.lock().unwrap();
        if let Some(cb) = guard.as_ref() {
            cb(Some(channel.clone()), None);
        }
        channel
    }

    /// Synthesizes a failed accept (bootstrap reported an error before a
    /// channel could be created).
    pub fn accept_failure(&self, error: Error) {
        let guard = self.accept_setup.lock().unwrap();
        if let Some(cb) = guard.as_ref() {
            cb(None, Some(error));
        }
    }
}

impl ServerBootstrap for LoopbackServerBootstrap {
    fn new_socket_listener(
        &self,
        _port: u16,
        on_accept_setup: AcceptSetupCallback,
        on_accept_shutdown: AcceptShutdownCallback,
        on_listener_destroy: ListenerDestroyCallback,
    ) -> Result<Box<dyn ListeningSocket>, Error> {
        *self.accept_setup.lock().unwrap() = Some(on_accept_setup);
        *self.accept_shutdown.lock().unwrap() = Some(Arc::new(on_accept_shutdown));
        Ok(Box::new(LoopbackListeningSocket {
            on_listener_destroy: Mutex::new(Some(on_listener_destroy)),
        }))
    }

    fn new_tls_socket_listener(
        &self,
        port: u16,
        on_accept_setup: AcceptSetupCallback,
        on_accept_shutdown: AcceptShutdownCallback,
        on_listener_destroy: ListenerDestroyCallback,
    ) -> Result<Box<dyn ListeningSocket>, Error> {
        self.new_socket_listener(port, on_accept_setup, on_accept_shutdown, on_listener_destroy)
    }
}

/// The loopback [`SystemVtable`]: every client bootstrap and server
/// bootstrap it vends shares state, so a test can script a connect
/// outcome and then immediately call `client_connect`.
pub struct LoopbackVtable {
    client: Arc<LoopbackClientBootstrap>,
    server: Arc<LoopbackServerBootstrap>,
}

impl LoopbackVtable {
    /// Creates a fresh loopback vtable with empty client/server bootstraps.
    pub fn new() -> LoopbackVtable {
        LoopbackVtable {
            client: LoopbackClientBootstrap::new(),
            server: LoopbackServerBootstrap::new(),
        }
    }

    /// Access to the underlying client bootstrap, to script outcomes.
    pub fn client(&self) -> Arc<LoopbackClientBootstrap> {
        self.client.clone()
    }

    /// Access to the underlying server bootstrap, to drive accepts.
    pub fn server(&self) -> Arc<LoopbackServerBootstrap> {
        self.server.clone()
    }
}

impl Default for LoopbackVtable {
    fn default() -> LoopbackVtable {
        LoopbackVtable::new()
    }
}

impl SystemVtable for LoopbackVtable {
    fn client_bootstrap(&self) -> Arc<dyn ClientBootstrap> {
        self.client.clone()
    }

    fn server_bootstrap(&self) -> Arc<dyn ServerBootstrap> {
        self.server.clone()
    }
}

/// Convenience constructor for [`crate::system::set_system_vtable`].
pub fn vtable() -> LoopbackVtable {
    LoopbackVtable::new()
}
