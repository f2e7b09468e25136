//! HTTP transport for the JSON-RPC dispatcher
//!
//! Provides the external API routing: the JSON-RPC endpoint plus health and discovery.

pub mod handlers;
