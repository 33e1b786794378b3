#![deny(missing_debug_implementations)]
#![cfg_attr(test, deny(rust_2018_idioms))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # http-core
//!
//! `http-core` is the protocol-agnostic connection lifecycle and dispatch
//! layer of an asynchronous, event-driven HTTP client/server library. It
//! sits on top of a generic byte-oriented channel abstraction (sockets,
//! TLS, or in-memory test channels) and presents a uniform abstract
//! [`Connection`] to callers while internally choosing and instantiating a
//! version-specific protocol engine (HTTP/1.1 today, HTTP/2 gated).
//!
//! Three subsystems make up the crate:
//!
//! - **Version negotiation & connection construction** ([`factory`]) — turns
//!   a freshly set up channel (possibly carrying TLS ALPN state) into a
//!   typed connection and splices a protocol handler into its pipeline.
//! - **Connection and server lifecycle management** ([`connection`],
//!   [`server`]) — reference-counted connections, two-phase server
//!   shutdown against a thread-safe channel-to-connection registry, and a
//!   precise callback-ordering contract.
//! - **Protocol-agnostic dispatch** ([`proto`]) — the vtable every
//!   version-specific engine implements, plus the client/server role split.
//!
//! This crate does not parse HTTP bytes, perform DNS, or own sockets
//! directly, and it does not multiplex across connections; that lives in a
//! connection-manager layer above this one.
//!
//! # Optional Features
//!
//! - `http1`: compiles the HTTP/1.1 protocol engine.
//! - `http2`: compiles the HTTP/2 protocol engine stub. It is present but
//!   gated: the factory panics if a connection actually negotiates it.
//! - `client`: enables [`client_connect`](client::client_connect).
//! - `server`: enables [`server::Server`].
//! - `tcp`: a `tokio`-backed [`bootstrap`] implementation.
//! - `tracing`: structured logging via the `tracing` crate.
//! - `full`: enables everything above.

#[doc(no_inline)]
pub use http::Method;

pub use crate::connection::Connection;
pub use crate::error::{Error, Result};
pub use crate::version::Version;

#[macro_use]
mod cfg;

#[macro_use]
mod trace;

pub mod bootstrap;
pub mod channel;
mod connection;
pub mod error;
mod factory;
pub mod library;
pub mod method;
pub mod proto;
pub mod status;
pub mod strutil;
pub mod system;
pub mod version;

cfg_client! {
    pub mod client;
}

cfg_server! {
    pub mod server;
}
