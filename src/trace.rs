#![allow(unused_macros)]

// Thin facade over `tracing` so call sites don't need to gate on the
// `tracing` feature themselves. Target names mirror the log subject tags
// from the connection core's external spec: `general`, `connection`,
// `server`, `stream`, `connection_manager`, `websocket`, `websocket_setup`.

macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::trace!(target: $target, $($arg)+);
    };
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)+);
    };
}

macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: $target, $($arg)+);
    };
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)+);
    };
}

macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::info!(target: $target, $($arg)+);
    };
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::info!($($arg)+);
    };
}

macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::warn!(target: $target, $($arg)+);
    };
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::warn!($($arg)+);
    };
}

macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::error!(target: $target, $($arg)+);
    };
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::error!($($arg)+);
    };
}

/// Log subject tags, reused as `tracing` targets at every call site in this
/// crate. `websocket`, `websocket_setup` and `connection_manager` are
/// reserved: no code in this crate logs under them yet, but callers
/// layering those protocols on top of a `Connection` should use them so
/// that all HTTP-family logging shares one naming scheme.
pub mod subject {
    pub const GENERAL: &str = "http_core::general";
    pub const CONNECTION: &str = "http_core::connection";
    pub const SERVER: &str = "http_core::server";
    pub const STREAM: &str = "http_core::stream";
    pub const CONNECTION_MANAGER: &str = "http_core::connection_manager";
    pub const WEBSOCKET: &str = "http_core::websocket";
    pub const WEBSOCKET_SETUP: &str = "http_core::websocket_setup";
}
