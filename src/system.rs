//! System-vtable indirection (Component H).
//!
//! A process-wide swappable pointer to the socket/TLS bootstrap functions,
//! so tests can substitute an in-memory channel factory without
//! conditional compilation. The default points at the real,
//! `tokio`-backed bootstrap (when the `tcp` feature is enabled).
//!
//! The setter is intentionally not a fine-grained synchronization
//! primitive: callers are expected to call [`set_system_vtable`] once,
//! before any connect attempt, exactly as the upstream contract documents.
//! `OnceLock<RwLock<..>>` gives that the same "set before I/O, don't race
//! it" semantics as the original unsynchronized pointer swap, but safely.

use std::sync::{Arc, OnceLock, RwLock};

use crate::bootstrap::{ClientBootstrap, ServerBootstrap};

/// The bootstrap functions the factory and connect paths call into. Tests
/// substitute an in-memory implementation here; production code uses the
/// default `tokio`-backed one.
pub trait SystemVtable: Send + Sync {
    /// Returns the client bootstrap to use for new outbound connections.
    fn client_bootstrap(&self) -> Arc<dyn ClientBootstrap>;

    /// Returns the server bootstrap to use for new listening sockets.
    fn server_bootstrap(&self) -> Arc<dyn ServerBootstrap>;
}

static VTABLE: OnceLock<RwLock<Arc<dyn SystemVtable>>> = OnceLock::new();

fn cell() -> &'static RwLock<Arc<dyn SystemVtable>> {
    VTABLE.get_or_init(|| RwLock::new(Arc::new(crate::bootstrap::default_vtable())))
}

/// Returns the currently installed system vtable.
pub fn system_vtable() -> Arc<dyn SystemVtable> {
    cell().read().unwrap().clone()
}

/// Replaces the system vtable. Not synchronized against concurrent
/// connect attempts; call this before starting any I/O, same as the
/// upstream contract this is modeled on.
pub fn set_system_vtable(vtable: Arc<dyn SystemVtable>) {
    *cell().write().unwrap() = vtable;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::loopback;

    #[test]
    fn default_vtable_is_installed_lazily() {
        let _guard = crate::library::serialize_for_test();
        let vtable = system_vtable();
        // Just needs to not panic and return something usable.
        let _ = vtable.client_bootstrap();
    }

    #[test]
    fn set_system_vtable_swaps_it() {
        let _guard = crate::library::serialize_for_test();
        let loopback_vtable = Arc::new(loopback::vtable());
        set_system_vtable(loopback_vtable.clone() as Arc<dyn SystemVtable>);
        let installed = system_vtable();
        let _ = installed.server_bootstrap();
    }
}
