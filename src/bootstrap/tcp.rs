//! A `tokio`-backed [`ClientBootstrap`]/[`ServerBootstrap`] implementation.
//!
//! This is intentionally thin: real HTTP wire parsing is out of scope for
//! this crate (see the crate-level docs), so once a socket is open this
//! bootstrap does nothing with its bytes beyond keeping the connection
//! alive until shutdown is requested. TLS is a genuine external
//! collaborator this crate does not implement; `new_tls_socket_channel`
//! and `new_tls_socket_listener` report [`Kind::UnsupportedProtocol`] until
//! a TLS implementation is wired in above this layer.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use crate::bootstrap::{
    AcceptSetupCallback, AcceptShutdownCallback, ClientBootstrap, ConnectOptions,
    ListenerDestroyCallback, ListeningSocket, ServerBootstrap, SetupCallback, ShutdownCallback,
};
use crate::channel::Channel;
use crate::error::Error;
use crate::system::SystemVtable;

/// The real, `tokio`-backed bootstrap.
pub struct TcpVtable {
    client: Arc<TcpClientBootstrap>,
    server: Arc<TcpServerBootstrap>,
}

impl TcpVtable {
    /// Creates a new `tokio`-backed vtable.
    pub fn new() -> TcpVtable {
        TcpVtable {
            client: Arc::new(TcpClientBootstrap),
            server: Arc::new(TcpServerBootstrap),
        }
    }
}

impl Default for TcpVtable {
    fn default() -> TcpVtable {
        TcpVtable::new()
    }
}

impl SystemVtable for TcpVtable {
    fn client_bootstrap(&self) -> Arc<dyn ClientBootstrap> {
        self.client.clone()
    }

    fn server_bootstrap(&self) -> Arc<dyn ServerBootstrap> {
        self.server.clone()
    }
}

struct TcpClientBootstrap;

impl ClientBootstrap for TcpClientBootstrap {
    fn new_socket_channel(
        &self,
        options: ConnectOptions,
        on_setup: SetupCallback,
        on_shutdown: ShutdownCallback,
    ) {
        tokio::spawn(async move {
            match TcpStream::connect((options.host.as_str(), options.port)).await {
                Ok(stream) => {
                    let channel = Arc::new(Channel::new());
                    bind_keepalive(stream, &channel, move |err| on_shutdown(err));
                    on_setup(Some(channel), None);
                }
                Err(err) => on_setup(None, Some(Error::new_io(err))),
            }
        });
    }

    fn new_tls_socket_channel(
        &self,
        _options: ConnectOptions,
        on_setup: SetupCallback,
        _on_shutdown: ShutdownCallback,
    ) {
        on_setup(None, Some(Error::new_unsupported_protocol()));
    }
}

/// Registers the channel's shutdown callback so that shutting down the
/// channel drops the socket, then (after dropping it) runs `after`. This
/// is the only place this crate reads or writes the raw socket at all:
/// the protocol engine that the factory splices into the channel is
/// where real byte traffic would flow once one handles real wire bytes.
fn bind_keepalive(
    stream: TcpStream,
    channel: &Arc<Channel>,
    after: impl FnOnce(Option<Error>) + Send + 'static,
) {
    let notify = Arc::new(Notify::new());
    let notify_for_task = notify.clone();
    tokio::spawn(async move {
        notify_for_task.notified().await;
        drop(stream);
    });
    channel.on_shutdown(move |err| {
        notify.notify_one();
        after(err);
    });
}

struct TcpServerBootstrap;

struct TcpListeningSocket {
    shutdown: Arc<Notify>,
}

impl ListeningSocket for TcpListeningSocket {
    fn destroy(self: Box<Self>) {
        self.shutdown.notify_waiters();
    }
}

impl ServerBootstrap for TcpServerBootstrap {
    fn new_socket_listener(
        &self,
        port: u16,
        on_accept_setup: AcceptSetupCallback,
        on_accept_shutdown: AcceptShutdownCallback,
        on_listener_destroy: ListenerDestroyCallback,
    ) -> Result<Box<dyn ListeningSocket>, Error> {
        let listener = std::net::TcpListener::bind(("0.0.0.0", port)).map_err(Error::new_io)?;
        listener.set_nonblocking(true).map_err(Error::new_io)?;
        let listener = TcpListener::from_std(listener).map_err(Error::new_io)?;
        let shutdown = Arc::new(Notify::new());
        let shutdown_for_task = shutdown.clone();
        let on_accept_shutdown = Arc::new(on_accept_shutdown);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_for_task.notified() => break,
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, _addr)) => {
                                let channel = Arc::new(Channel::new());
                                let channel_for_cb = channel.clone();
                                let on_accept_shutdown = on_accept_shutdown.clone();
                                bind_keepalive(stream, &channel, move |err| {
                                    on_accept_shutdown(channel_for_cb, err);
                                });
                                on_accept_setup(Some(channel), None);
                            }
                            Err(err) => on_accept_setup(None, Some(Error::new_io(err))),
                        }
                    }
                }
            }
            on_listener_destroy();
        });

        Ok(Box::new(TcpListeningSocket { shutdown }))
    }

    fn new_tls_socket_listener(
        &self,
        _port: u16,
        _on_accept_setup: AcceptSetupCallback,
        _on_accept_shutdown: AcceptShutdownCallback,
        _on_listener_destroy: ListenerDestroyCallback,
    ) -> Result<Box<dyn ListeningSocket>, Error> {
        Err(Error::new_unsupported_protocol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_refused_surfaces_io_error() {
        let bootstrap = TcpClientBootstrap;
        let (tx, rx) = tokio::sync::oneshot::channel();
        bootstrap.new_socket_channel(
            ConnectOptions {
                host: "127.0.0.1".into(),
                port: 1, // privileged/unused port, expected to be refused
            },
            Box::new(move |channel, err| {
                let _ = tx.send((channel.is_some(), err.is_some()));
            }),
            Box::new(|_| {}),
        );
        let (has_channel, has_err) = rx.await.unwrap();
        assert!(!has_channel);
        assert!(has_err);
    }
}
