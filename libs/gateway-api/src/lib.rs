//! Request and response payloads exposed by the flowgate HTTP API.
//!
//! Field names follow the camelCase convention the gateway's callers use.

pub mod models;

pub use models::*;
