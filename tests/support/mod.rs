//! Shared helpers for the integration tests in this directory, the way the
//! teacher's own `tests/support/mod.rs` centralizes setup shared by
//! `tests/client.rs` and `tests/server.rs`.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex, Once};

use http_core::bootstrap::loopback::LoopbackVtable;
use http_core::error::Error;
use http_core::system::{set_system_vtable, SystemVtable};

static INIT: Once = Once::new();
// Every test in this crate swaps the process-wide system vtable; they must
// not run concurrently with each other, or with any other test in this
// binary that also touches it.
static SERIALIZE: Mutex<()> = Mutex::new(());

/// Installs a fresh, empty loopback vtable as the process-wide system
/// vtable and returns a guard that must be held for the duration of the
/// test (it serializes against every other test in this crate that also
/// calls this function).
pub fn install_loopback() -> (std::sync::MutexGuard<'static, ()>, Arc<LoopbackVtable>) {
    let guard = SERIALIZE.lock().unwrap_or_else(|p| p.into_inner());
    INIT.call_once(http_core::library::init);
    let vtable = Arc::new(LoopbackVtable::new());
    set_system_vtable(vtable.clone() as Arc<dyn SystemVtable>);
    (guard, vtable)
}

/// An `Error` a test can hand to a scripted bootstrap failure.
///
/// `Error` is a closed type, same shape as the teacher's own `error.rs`:
/// code outside this crate can only construct one through a `From`
/// conversion, never by naming a `Kind` directly. `io::Error` is the one
/// conversion this crate exposes publicly, so that's what a bootstrap
/// implementor (and these tests, standing in for one) uses to report a
/// connect failure.
pub fn io_refused() -> Error {
    io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into()
}
