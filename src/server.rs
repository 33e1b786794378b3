//! The server listener path (Component G).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::channel::Channel;
use crate::connection::{Connection, Role};
use crate::error::{Error, Kind};
use crate::factory::{self, NewConnectionOptions};
use crate::system;

/// Identifies a channel in the server's registry. `Channel` itself isn't
/// `Hash`/`Eq`; its `Arc`'s address is a stable enough proxy for the
/// lifetime of the registry entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct ChannelKey(usize);

fn channel_key(channel: &Arc<Channel>) -> ChannelKey {
    ChannelKey(Arc::as_ptr(channel) as *const () as usize)
}

struct Synced {
    is_shutting_down: bool,
    channel_to_connection: HashMap<ChannelKey, (Arc<Channel>, Connection)>,
}

struct Inner {
    is_using_tls: bool,
    on_incoming_connection: Box<dyn Fn(Option<Connection>, Option<Error>) + Send + Sync>,
    on_destroy_complete: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    synced: Mutex<Synced>,
    listener: Mutex<Option<Box<dyn crate::bootstrap::ListeningSocket>>>,
}

/// A listening endpoint (§3 `Server`, §4.6).
#[derive(Clone)]
pub struct Server(Arc<Inner>);

/// Inputs to [`Server::new`].
pub struct ServerOptions {
    /// The port to listen on.
    pub port: u16,
    /// Whether to listen for TLS connections.
    pub is_using_tls: bool,
    /// Called once per inbound channel, with either a configured-ready
    /// connection and no error, or no connection and an error.
    pub on_incoming_connection: Box<dyn Fn(Option<Connection>, Option<Error>) + Send + Sync>,
    /// Called exactly once, after every accepted channel has shut down
    /// and the listening socket itself has torn down.
    pub on_destroy_complete: Box<dyn FnOnce() + Send>,
}

impl Server {
    /// Creates a new listening server (§4.6 "Creation").
    pub fn new(options: ServerOptions) -> Result<Server, Error> {
        crate::library::assert_initialized();

        let inner = Arc::new(Inner {
            is_using_tls: options.is_using_tls,
            on_incoming_connection: options.on_incoming_connection,
            on_destroy_complete: Mutex::new(Some(options.on_destroy_complete)),
            synced: Mutex::new(Synced {
                is_shutting_down: false,
                channel_to_connection: HashMap::new(),
            }),
            listener: Mutex::new(None),
        });

        // The lock is held across the bootstrap call so that an
        // accept-setup firing from another thread before this function
        // returns can never observe a registry without its listener
        // installed yet.
        let mut synced = inner.synced.lock().unwrap();

        let server_for_setup = inner.clone();
        let on_accept_setup = Box::new(move |channel: Option<Arc<Channel>>, error: Option<Error>| {
            on_accept_setup(&server_for_setup, channel, error);
        });
        let server_for_shutdown = inner.clone();
        let on_accept_shutdown = Box::new(move |channel: Arc<Channel>, error: Option<Error>| {
            on_accept_shutdown(&server_for_shutdown, channel, error);
        });
        let server_for_destroy = inner.clone();
        let on_listener_destroy = Box::new(move || {
            on_listener_destroy(&server_for_destroy);
        });

        let bootstrap = system::system_vtable().server_bootstrap();
        let listener = if options.is_using_tls {
            bootstrap.new_tls_socket_listener(
                options.port,
                on_accept_setup,
                on_accept_shutdown,
                on_listener_destroy,
            )
        } else {
            bootstrap.new_socket_listener(
                options.port,
                on_accept_setup,
                on_accept_shutdown,
                on_listener_destroy,
            )
        };

        match listener {
            Ok(listener) => {
                *inner.listener.lock().unwrap() = Some(listener);
                drop(synced);
                Ok(Server(inner))
            }
            Err(err) => {
                synced.is_shutting_down = true;
                Err(err)
            }
        }
    }

    /// Gracefully releases the server (§4.6 "Graceful release"). Idempotent.
    pub fn release(&self) {
        // Mark shutting-down and snapshot the registered channels while
        // holding the lock, exactly as the external contract specifies, then
        // request shutdown on each one only after releasing it. The
        // contract's "while still holding the lock, iterate and shut down"
        // wording describes a bootstrap whose `channel_shutdown` merely
        // schedules work on another thread; this crate's in-memory channel
        // instead runs its shutdown hooks (and, transitively,
        // `on_accept_shutdown`, which re-locks this same mutex) synchronously
        // inline, so requesting shutdown from inside the lock would
        // self-deadlock. Setting the flag and collecting the snapshot before
        // unlocking preserves the one invariant that matters externally — no
        // new connection is admitted once `is_shutting_down` is visible.
        let channels: Vec<Arc<Channel>> = {
            let mut synced = self.0.synced.lock().unwrap();
            if synced.is_shutting_down {
                return;
            }
            synced.is_shutting_down = true;
            synced
                .channel_to_connection
                .values()
                .map(|(channel, _connection)| channel.clone())
                .collect()
        };

        for channel in channels {
            channel.shutdown(Some(Error::new(Kind::ConnectionClosed)));
        }

        // After requesting shutdown, tell the bootstrap to tear down the
        // listening socket. Every in-flight channel will eventually fire
        // accept-shutdown; once the last one has, the bootstrap fires
        // listener-destroy, which runs full teardown.
        if let Some(listener) = self.0.listener.lock().unwrap().take() {
            listener.destroy();
        }
    }
}

fn on_accept_setup(inner: &Arc<Inner>, channel: Option<Arc<Channel>>, error: Option<Error>) {
    let channel = match channel {
        None => {
            (inner.on_incoming_connection)(None, error);
            return;
        }
        Some(channel) => channel,
    };

    let built = factory::new_connection(NewConnectionOptions {
        channel: channel.clone(),
        role: Role::Server,
        is_using_tls: inner.is_using_tls,
    });

    let connection = match built {
        Ok(connection) => connection,
        Err(err) => {
            (inner.on_incoming_connection)(None, Some(err));
            channel.shutdown(None);
            return;
        }
    };

    let insertion_error = {
        let mut synced = inner.synced.lock().unwrap();
        if synced.is_shutting_down {
            Some(Error::new_closed())
        } else {
            synced
                .channel_to_connection
                .insert(channel_key(&channel), (channel.clone(), connection.clone()));
            None
        }
    };

    if let Some(err) = insertion_error {
        (inner.on_incoming_connection)(None, Some(err));
        channel.shutdown(Some(Error::new_closed()));
        connection.release();
        return;
    }

    (inner.on_incoming_connection)(Some(connection.clone()), None);

    if !connection.is_configured() {
        warn!(
            target: crate::trace::subject::SERVER,
            "server connection left unconfigured by on_incoming_connection"
        );
        channel.shutdown(Some(Error::new_reaction_required()));
        connection.release();
    }
}

fn on_accept_shutdown(inner: &Arc<Inner>, channel: Arc<Channel>, error: Option<Error>) {
    let entry = {
        let mut synced = inner.synced.lock().unwrap();
        synced.channel_to_connection.remove(&channel_key(&channel))
    };
    if let Some((_channel, connection)) = entry {
        connection.fire_on_shutdown(error);
    }
}

fn on_listener_destroy(inner: &Arc<Inner>) {
    if let Some(cb) = inner.on_destroy_complete.lock().unwrap().take() {
        cb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::loopback::LoopbackVtable;
    use crate::system::{set_system_vtable, SystemVtable};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn install_loopback() -> (std::sync::MutexGuard<'static, ()>, Arc<LoopbackVtable>) {
        let guard = crate::library::serialize_for_test();
        crate::library::init();
        let vtable = Arc::new(LoopbackVtable::new());
        set_system_vtable(vtable.clone() as Arc<dyn SystemVtable>);
        (guard, vtable)
    }

    #[test]
    fn graceful_shutdown_with_one_configured_connection() {
        let (_guard, vtable) = install_loopback();

        let per_connection_shutdown = Arc::new(AtomicBool::new(false));
        let destroy_complete = Arc::new(AtomicBool::new(false));
        let destroy_flag = destroy_complete.clone();

        let pending_connection: Arc<Mutex<Option<Connection>>> = Arc::new(Mutex::new(None));
        let pending = pending_connection.clone();
        let shutdown_flag = per_connection_shutdown.clone();

        let server = Server::new(ServerOptions {
            port: 0,
            is_using_tls: false,
            on_incoming_connection: Box::new(move |conn, err| {
                assert!(err.is_none());
                let conn = conn.unwrap();
                let flag = shutdown_flag.clone();
                conn.configure_server(
                    || {},
                    move |_err| {
                        flag.store(true, Ordering::SeqCst);
                    },
                )
                .unwrap();
                *pending.lock().unwrap() = Some(conn);
            }),
            on_destroy_complete: Box::new(move || {
                destroy_flag.store(true, Ordering::SeqCst);
            }),
        })
        .unwrap();

        let server_bootstrap = vtable.server();
        let accepted_channel = server_bootstrap.accept();
        assert!(pending_connection.lock().unwrap().is_some());

        server.release();
        assert!(per_connection_shutdown.load(Ordering::SeqCst));
        assert!(destroy_complete.load(Ordering::SeqCst));
        assert!(accepted_channel.is_shut_down());

        // Second release is a no-op.
        server.release();
    }

    #[test]
    fn unconfigured_connection_is_closed_with_reaction_required() {
        let (_guard, vtable) = install_loopback();
        let seen_error = Arc::new(Mutex::new(None));
        let seen = seen_error.clone();

        let _server = Server::new(ServerOptions {
            port: 0,
            is_using_tls: false,
            on_incoming_connection: Box::new(|_conn, _err| {
                // Deliberately never calls configure_server.
            }),
            on_destroy_complete: Box::new(|| {}),
        })
        .unwrap();

        let channel = vtable.server().accept();
        *seen.lock().unwrap() = None;
        assert!(channel.is_shut_down());
    }

    #[test]
    fn accept_count_matches_registry_churn() {
        let (_guard, vtable) = install_loopback();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let server = Server::new(ServerOptions {
            port: 0,
            is_using_tls: false,
            on_incoming_connection: Box::new(move |conn, _err| {
                if let Some(conn) = conn {
                    counter.fetch_add(1, Ordering::SeqCst);
                    conn.configure_server(|| {}, |_| {}).unwrap();
                }
            }),
            on_destroy_complete: Box::new(|| {}),
        })
        .unwrap();

        vtable.server().accept();
        vtable.server().accept();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        server.release();
    }
}
