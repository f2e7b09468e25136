//! Receivers shipped with the server binary
//!
//! Exposes the greeting service registered at startup.

pub mod hello;

pub use hello::HelloService;
