#![cfg(all(feature = "client", feature = "http1"))]

//! Integration tests for the client connect path (§4.7), driven entirely
//! through the public API and the in-memory loopback bootstrap (no real
//! sockets). These exercise the concrete client scenarios from the
//! external contract's testable-properties list end to end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use http_core::client::{client_connect, ClientConnectOptions};
use http_core::error::Kind;
use http_core::version::Version;

mod support;
use support::{install_loopback, io_refused};

// Scenario 1: plain client happy path.
#[test]
fn plain_client_happy_path() {
    let (_guard, vtable) = install_loopback();
    vtable.client().push_setup(None);

    let setup_result = Arc::new(Mutex::new(None));
    let result_for_closure = setup_result.clone();
    client_connect(ClientConnectOptions {
        host: "example.test".into(),
        port: 80,
        is_using_tls: false,
        user_data: None,
        proxy_request_transform: None,
        on_setup: Box::new(move |conn, err| {
            *result_for_closure.lock().unwrap() = Some((conn, err));
        }),
        on_shutdown: Box::new(|_, _| panic!("on_shutdown must not fire before any shutdown")),
    });

    let (conn, err) = setup_result.lock().unwrap().take().expect("on_setup fired");
    assert!(err.is_none());
    let conn = conn.expect("connection present on success");
    assert!(conn.is_client());
    assert_eq!(conn.get_version(), Version::Http11);
    assert!(conn.is_open());
}

// Scenario 3: client setup failure reports the error and never calls
// on_shutdown.
#[test]
fn client_setup_failure_reports_error_and_skips_shutdown() {
    let (_guard, vtable) = install_loopback();
    vtable.client().push_setup_failure(io_refused);

    let saw_failure = Arc::new(AtomicBool::new(false));
    let flag = saw_failure.clone();
    client_connect(ClientConnectOptions {
        host: "example.test".into(),
        port: 80,
        is_using_tls: false,
        user_data: None,
        proxy_request_transform: None,
        on_setup: Box::new(move |conn, err| {
            assert!(conn.is_none());
            assert_eq!(err.map(|e| e.kind()), Some(Kind::Io));
            flag.store(true, Ordering::SeqCst);
        }),
        on_shutdown: Box::new(|_, _| panic!("on_shutdown must never fire after setup failure")),
    });

    assert!(saw_failure.load(Ordering::SeqCst));
}

// Scenario 4: a successful setup followed by channel shutdown fires
// on_shutdown exactly once, with the connection still reachable.
#[test]
fn client_post_setup_shutdown_fires_once() {
    let (_guard, vtable) = install_loopback();
    vtable.client().push_setup(None);

    let channel_holder = Arc::new(Mutex::new(None));
    let holder = channel_holder.clone();
    let shutdown_count = Arc::new(Mutex::new(0u32));
    let count = shutdown_count.clone();

    client_connect(ClientConnectOptions {
        host: "example.test".into(),
        port: 80,
        is_using_tls: false,
        user_data: None,
        proxy_request_transform: None,
        on_setup: Box::new(move |conn, _err| {
            let conn = conn.expect("setup succeeded");
            *holder.lock().unwrap() = Some(conn.get_channel());
        }),
        on_shutdown: Box::new(move |conn, err| {
            assert!(conn.is_some());
            assert!(err.is_none());
            *count.lock().unwrap() += 1;
        }),
    });

    let channel = channel_holder.lock().unwrap().take().expect("channel captured");
    channel.shutdown(None);
    assert_eq!(*shutdown_count.lock().unwrap(), 1);
}
