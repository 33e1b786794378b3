#![cfg(all(feature = "server", feature = "http1"))]

//! Integration tests for the server listener path (§4.6), driven entirely
//! through the public API and the in-memory loopback bootstrap (no real
//! sockets). These exercise the concrete server scenarios from the
//! external contract's testable-properties list end to end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use http_core::server::{Server, ServerOptions};

mod support;
use support::install_loopback;

// Scenario 5: graceful server shutdown with one configured, live
// connection fires the per-connection shutdown callback, then
// on_destroy_complete, and a second release is a no-op.
#[test]
fn graceful_shutdown_with_one_live_connection() {
    let (_guard, vtable) = install_loopback();

    let per_connection_shutdown = Arc::new(AtomicBool::new(false));
    let destroy_complete = Arc::new(AtomicBool::new(false));
    let pending_connection = Arc::new(Mutex::new(None));

    let shutdown_flag = per_connection_shutdown.clone();
    let destroy_flag = destroy_complete.clone();
    let pending = pending_connection.clone();

    let server = Server::new(ServerOptions {
        port: 0,
        is_using_tls: false,
        on_incoming_connection: Box::new(move |conn, err| {
            assert!(err.is_none());
            let conn = conn.expect("accept setup succeeded");
            let flag = shutdown_flag.clone();
            conn.configure_server(
                || {},
                move |_err| {
                    flag.store(true, Ordering::SeqCst);
                },
            )
            .expect("configure_server from on_incoming_connection");
            *pending.lock().unwrap() = Some(conn);
        }),
        on_destroy_complete: Box::new(move || {
            destroy_flag.store(true, Ordering::SeqCst);
        }),
    })
    .expect("server_new succeeds");

    let accepted_channel = vtable.server().accept();
    assert!(pending_connection.lock().unwrap().is_some());
    assert!(!per_connection_shutdown.load(Ordering::SeqCst));
    assert!(!destroy_complete.load(Ordering::SeqCst));

    server.release();

    assert!(accepted_channel.is_shut_down());
    assert!(per_connection_shutdown.load(Ordering::SeqCst));
    assert!(destroy_complete.load(Ordering::SeqCst));

    // Idempotent: a second release must not panic or re-fire anything.
    server.release();
}

// Scenario 6: a server that never configures its connection gets it
// closed with ReactionRequired, and the listener still tears down cleanly.
#[test]
fn unconfigured_connection_is_closed_with_reaction_required() {
    let (_guard, vtable) = install_loopback();
    let destroy_complete = Arc::new(AtomicBool::new(false));
    let destroy_flag = destroy_complete.clone();

    let server = Server::new(ServerOptions {
        port: 0,
        is_using_tls: false,
        on_incoming_connection: Box::new(|conn, err| {
            assert!(err.is_none());
            assert!(conn.is_some());
            // Deliberately never calls configure_server: the server must
            // detect this and close the connection on its own.
        }),
        on_destroy_complete: Box::new(move || {
            destroy_flag.store(true, Ordering::SeqCst);
        }),
    })
    .expect("server_new succeeds");

    let accepted_channel = vtable.server().accept();
    assert!(accepted_channel.is_shut_down());

    server.release();
    assert!(destroy_complete.load(Ordering::SeqCst));
}

// Two independently accepted connections are both tracked in the
// registry and both torn down by one `release()` call.
#[test]
fn two_connections_both_torn_down_by_one_release() {
    let (_guard, vtable) = install_loopback();
    let configured_count = Arc::new(Mutex::new(0u32));
    let counter = configured_count.clone();

    let server = Server::new(ServerOptions {
        port: 0,
        is_using_tls: false,
        on_incoming_connection: Box::new(move |conn, _err| {
            if let Some(conn) = conn {
                conn.configure_server(|| {}, |_| {}).unwrap();
                *counter.lock().unwrap() += 1;
            }
        }),
        on_destroy_complete: Box::new(|| {}),
    })
    .expect("server_new succeeds");

    let first = vtable.server().accept();
    let second = vtable.server().accept();
    assert_eq!(*configured_count.lock().unwrap(), 2);

    server.release();
    assert!(first.is_shut_down());
    assert!(second.is_shut_down());
}
