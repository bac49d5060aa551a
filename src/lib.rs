//! bookshare application library
//!
//! Route modules plus the bootstrap that wires settings, store, verifier and
//! HTTP server together.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{build_app, build_verifier, connect_store, registry, run};
