//! Process-wide library lifecycle.
//!
//! Every other public entry point in this crate asserts that the library
//! has been initialized — a carried-over guard from the library this
//! contract was distilled from, which keeps a single lifecycle flag rather
//! than per-module ones.

use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Serializes tests (in this module and elsewhere) that flip the global
/// initialized flag, so the default parallel test runner can't interleave
/// one test's `clean_up` with another test's `assert_initialized`.
#[cfg(test)]
pub(crate) fn serialize_for_test() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Initializes the library. Idempotent.
pub fn init() {
    INITIALIZED.store(true, Ordering::SeqCst);
}

/// Tears down the library. Idempotent.
pub fn clean_up() {
    INITIALIZED.store(false, Ordering::SeqCst);
}

/// Asserts that [`init`] has been called. Every public entry point in this
/// crate that touches process-wide state calls this first.
///
/// # Panics
///
/// Panics if the library has not been initialized.
pub fn assert_initialized() {
    assert!(
        INITIALIZED.load(Ordering::SeqCst),
        "http_core::library::init() must be called before use"
    );
}
