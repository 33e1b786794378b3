//! The channel/slot/handler pipeline.
//!
//! This is an external dependency of the real library (the generic
//! byte-oriented channel runtime lives in a sibling crate there), but it is
//! the one piece of that dependency this crate must model concretely to be
//! testable: [`crate::factory::new_connection`]
//! needs a pipeline to splice a protocol handler into, and the concrete
//! scenarios in the external test-properties list drive a connection entirely
//! through a loopback channel. So this module provides the trait surface
//! plus a minimal, in-memory [`Channel`] good enough to run protocol
//! engines and tests against; it does not do real I/O (see [`crate::bootstrap`]
//! for that).

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::Error;

/// A byte-processing plugin embedded in a [`Slot`].
///
/// `shutdown` is called at most once, when the channel initiates shutdown;
/// implementations should treat it as idempotent from their own side (the
/// channel itself guarantees it is only invoked once per handler).
pub trait ChannelHandler: Send + Sync {
    /// Called once when the channel shuts down.
    fn shutdown(&self) {}

    /// The ALPN protocol this handler negotiated, if it is a TLS handler.
    /// Non-TLS handlers return `None`. An empty (but present) negotiated
    /// protocol is represented as `Some(Vec::new())`.
    fn alpn_protocol(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Opaque identifier for a slot within a [`Channel`]'s pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

struct Slot {
    id: SlotId,
    handler: Option<Box<dyn ChannelHandler>>,
}

struct Inner {
    slots: Vec<Slot>,
    next_slot_id: usize,
    shut_down: bool,
    on_shutdown: Option<Box<dyn FnOnce(Option<Error>) + Send>>,
}

/// An ordered, bidirectional pipeline of slots, each hosting one handler.
/// Owns its own refcount (the "hold" count) independent of any `Arc`
/// strong count a caller keeps on the `Channel` itself.
pub struct Channel {
    inner: Mutex<Inner>,
    holds: AtomicUsize,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("holds", &self.holds.load(Ordering::SeqCst))
            .finish()
    }
}

impl Channel {
    /// Creates a new, empty channel pipeline.
    pub fn new() -> Channel {
        Channel {
            inner: Mutex::new(Inner {
                slots: Vec::new(),
                next_slot_id: 0,
                shut_down: false,
                on_shutdown: None,
            }),
            holds: AtomicUsize::new(0),
        }
    }

    /// Registers a callback to run exactly once, the first time
    /// [`shutdown`](Channel::shutdown) is called. Used by a bootstrap
    /// implementation to learn when to fire its own accept-shutdown or
    /// client-shutdown callback.
    pub fn on_shutdown<F>(&self, f: F)
    where
        F: FnOnce(Option<Error>) + Send + 'static,
    {
        self.inner.lock().unwrap().on_shutdown = Some(Box::new(f));
    }

    /// Allocates a new, handler-less slot and appends it to the end of the
    /// pipeline.
    pub fn slot_insert_end(&self) -> SlotId {
        let mut inner = self.inner.lock().unwrap();
        let id = SlotId(inner.next_slot_id);
        inner.next_slot_id += 1;
        inner.slots.push(Slot { id, handler: None });
        id
    }

    /// Removes a slot from the pipeline. A no-op if the slot is not present
    /// (already removed).
    pub fn slot_remove(&self, slot: SlotId) {
        let mut inner = self.inner.lock().unwrap();
        inner.slots.retain(|s| s.id != slot);
    }

    /// Installs `handler` into `slot`, replacing any existing handler.
    pub fn slot_set_handler(&self, slot: SlotId, handler: Box<dyn ChannelHandler>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(s) = inner.slots.iter_mut().find(|s| s.id == slot) {
            s.handler = Some(handler);
        }
    }

    /// Returns the ALPN protocol negotiated by the handler in the slot
    /// immediately upstream (to the left) of `slot`, if any. Used by the
    /// connection factory to read TLS ALPN state without knowing anything
    /// about TLS itself.
    pub fn adj_left_alpn_protocol(&self, slot: SlotId) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        let pos = inner.slots.iter().position(|s| s.id == slot)?;
        let left = pos.checked_sub(1)?;
        inner.slots.get(left)?.handler.as_deref()?.alpn_protocol()
    }

    /// Acquires a hold on this channel, extending its lifetime
    /// independently of any `Arc` reference a caller may also be holding.
    pub fn acquire_hold(&self) {
        self.holds.fetch_add(1, Ordering::SeqCst);
    }

    /// Releases a previously acquired hold.
    pub fn release_hold(&self) {
        self.holds.fetch_sub(1, Ordering::SeqCst);
    }

    /// The number of outstanding holds on this channel.
    pub fn hold_count(&self) -> usize {
        self.holds.load(Ordering::SeqCst)
    }

    /// Initiates shutdown with the given error (or success). Idempotent:
    /// only the first call runs handler shutdown hooks and fires the
    /// registered `on_shutdown` callback.
    pub fn shutdown(&self, error: Option<Error>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.shut_down {
            return;
        }
        inner.shut_down = true;
        for slot in &inner.slots {
            if let Some(handler) = slot.handler.as_ref() {
                handler.shutdown();
            }
        }
        let cb = inner.on_shutdown.take();
        drop(inner);
        if let Some(cb) = cb {
            cb(error);
        }
    }

    /// True once [`shutdown`](Channel::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().unwrap().shut_down
    }
}

impl Default for Channel {
    fn default() -> Channel {
        Channel::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    struct RecordingHandler {
        shut_down: Arc<AtomicBool>,
    }

    impl ChannelHandler for RecordingHandler {
        fn shutdown(&self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    struct TlsStub(&'static [u8]);
    impl ChannelHandler for TlsStub {
        fn alpn_protocol(&self) -> Option<Vec<u8>> {
            Some(self.0.to_vec())
        }
    }

    #[test]
    fn slot_insert_and_remove() {
        let channel = Channel::new();
        let slot = channel.slot_insert_end();
        channel.slot_set_handler(slot, Box::new(TlsStub(b"h2")));
        channel.slot_remove(slot);
        assert!(channel.adj_left_alpn_protocol(slot).is_none());
    }

    #[test]
    fn adj_left_alpn_protocol_reads_upstream_slot() {
        let channel = Channel::new();
        let tls_slot = channel.slot_insert_end();
        channel.slot_set_handler(tls_slot, Box::new(TlsStub(b"http/1.1")));
        let proto_slot = channel.slot_insert_end();
        assert_eq!(
            channel.adj_left_alpn_protocol(proto_slot),
            Some(b"http/1.1".to_vec())
        );
    }

    #[test]
    fn shutdown_runs_handlers_once() {
        let channel = Channel::new();
        let flag = Arc::new(AtomicBool::new(false));
        let slot = channel.slot_insert_end();
        channel.slot_set_handler(
            slot,
            Box::new(RecordingHandler {
                shut_down: flag.clone(),
            }),
        );
        channel.shutdown(None);
        assert!(flag.load(Ordering::SeqCst));
        // Second shutdown is a no-op, not a panic or double-invoke.
        channel.shutdown(None);
    }

    #[test]
    fn holds_are_independent_counters() {
        let channel = Channel::new();
        channel.acquire_hold();
        channel.acquire_hold();
        assert_eq!(channel.hold_count(), 2);
        channel.release_hold();
        assert_eq!(channel.hold_count(), 1);
    }
}
