//! The client connect path (Component F).

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::bootstrap::ConnectOptions;
use crate::channel::Channel;
use crate::connection::{Connection, Role};
use crate::error::Error;
use crate::factory::{self, NewConnectionOptions};
use crate::proto::RequestOptions;
use crate::system;

/// Inputs to [`client_connect`].
pub struct ClientConnectOptions {
    /// The host to connect to.
    pub host: String,
    /// The port to connect to.
    pub port: u16,
    /// Whether to use TLS for this connection.
    pub is_using_tls: bool,
    /// Opaque owner-supplied value, copied onto the connection once setup
    /// succeeds (§3 `user_data`, §4.7).
    pub user_data: Option<Arc<dyn Any + Send + Sync>>,
    /// An optional hook to rewrite outgoing requests, copied onto the
    /// connection once setup succeeds (§3 `client_data.proxy_request_transform`,
    /// §4.7). Full proxy support (the proxy layer itself) is out of scope
    /// for this crate; this is only the pass-through seam a proxy layer
    /// built on top of this crate would install.
    pub proxy_request_transform: Option<Box<dyn Fn(&mut RequestOptions) + Send + Sync>>,
    /// Called exactly once: either with `(Some(connection), None)` on
    /// success, or `(None, Some(error))` on failure. Never both.
    pub on_setup: Box<dyn FnOnce(Option<Connection>, Option<Error>) + Send>,
    /// Called at most once, and only after a successful `on_setup`, when
    /// the connection's channel finishes shutting down.
    pub on_shutdown: Box<dyn FnOnce(Option<Connection>, Option<Error>) + Send>,
}

// Transient per-connect state (§3, `ClientBootstrapRecord`). Lives only
// inside the closures passed to the bootstrap; there is no separate
// "free" step in Rust; dropping the closures after they run is the
// release.
struct Record {
    on_setup: Option<Box<dyn FnOnce(Option<Connection>, Option<Error>) + Send>>,
    on_shutdown: Box<dyn FnOnce(Option<Connection>, Option<Error>) + Send>,
    connection: Option<Connection>,
}

/// Initiates an outbound connection (§4.7).
///
/// `on_setup` fires exactly once per attempt; `on_shutdown` fires at most
/// once, and only after a successful `on_setup`.
pub fn client_connect(options: ClientConnectOptions) {
    crate::library::assert_initialized();

    let user_data = options.user_data;
    let proxy_request_transform = options.proxy_request_transform;

    let record = Arc::new(Mutex::new(Record {
        on_setup: Some(options.on_setup),
        on_shutdown: options.on_shutdown,
        connection: None,
    }));

    let is_using_tls = options.is_using_tls;
    let connect_options = ConnectOptions {
        host: options.host,
        port: options.port,
    };

    let record_for_setup = record.clone();
    let on_bootstrap_setup = Box::new(move |channel: Option<Arc<Channel>>, error: Option<Error>| {
        on_channel_setup(
            record_for_setup,
            channel,
            error,
            is_using_tls,
            user_data,
            proxy_request_transform,
        );
    });
    let record_for_shutdown = record.clone();
    let on_bootstrap_shutdown = Box::new(move |error: Option<Error>| {
        on_channel_shutdown(record_for_shutdown, error);
    });

    let bootstrap = system::system_vtable().client_bootstrap();
    if is_using_tls {
        bootstrap.new_tls_socket_channel(connect_options, on_bootstrap_setup, on_bootstrap_shutdown);
    } else {
        bootstrap.new_socket_channel(connect_options, on_bootstrap_setup, on_bootstrap_shutdown);
    }
}

fn on_channel_setup(
    record: Arc<Mutex<Record>>,
    channel: Option<Arc<Channel>>,
    error: Option<Error>,
    is_using_tls: bool,
    user_data: Option<Arc<dyn Any + Send + Sync>>,
    proxy_request_transform: Option<Box<dyn Fn(&mut RequestOptions) + Send + Sync>>,
) {
    // Contract assumption: `channel != None` iff `error == None`.
    assert_eq!(
        channel.is_some(),
        error.is_none(),
        "bootstrap violated the channel/error exclusivity contract"
    );

    match channel {
        None => {
            let on_setup = record.lock().unwrap().on_setup.take();
            if let Some(on_setup) = on_setup {
                on_setup(None, error);
            }
            // No shutdown callback will follow: the record is simply
            // dropped once this closure returns.
        }
        Some(channel) => {
            let built = factory::new_connection(NewConnectionOptions {
                channel: channel.clone(),
                role: Role::Client,
                is_using_tls,
            });
            match built {
                Ok(connection) => {
                    // Copy the proxy hook and user-data onto the
                    // connection now that it exists (§4.7).
                    if let Some(user_data) = user_data {
                        connection.set_user_data(user_data);
                    }
                    if let Some(hook) = proxy_request_transform {
                        connection.set_proxy_request_transform(hook);
                    }

                    let on_setup = {
                        let mut guard = record.lock().unwrap();
                        guard.connection = Some(connection.clone());
                        guard.on_setup.take()
                    };
                    if let Some(on_setup) = on_setup {
                        on_setup(Some(connection), None);
                    }
                    // `on_setup` is now cleared; the eventual shutdown
                    // callback routes to `on_shutdown` only.
                }
                Err(err) => {
                    // Factory failure: defer setup reporting to the
                    // shutdown callback, and request channel shutdown
                    // with the error that caused it.
                    error!(
                        target: crate::trace::subject::CONNECTION,
                        error = ?err,
                        "client connection factory failed"
                    );
                    channel.shutdown(Some(err));
                }
            }
        }
    }
}

fn on_channel_shutdown(record: Arc<Mutex<Record>>, error: Option<Error>) {
    let mut guard = record.lock().unwrap();
    if let Some(on_setup) = guard.on_setup.take() {
        // Setup never succeeded: coerce a missing error to `Unknown` so
        // the contract that setup-failure always carries a non-zero code
        // holds.
        let error = error.or_else(|| Some(Error::new(crate::error::Kind::Unknown)));
        drop(guard);
        on_setup(None, error);
        return;
    }
    // `on_shutdown` can only be taken once: `Record` isn't reused, and
    // `client_connect` only ever wires one `on_channel_shutdown` per
    // attempt, so this runs at most once.
    let on_shutdown = std::mem::replace(&mut guard.on_shutdown, Box::new(|_, _| {}));
    let connection = guard.connection.take();
    drop(guard);
    on_shutdown(connection, error);
}
