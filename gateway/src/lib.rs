//! flowgate Library
//!
//! HTTP gateway in front of a DolphinScheduler deployment.

pub mod app;
pub mod authn;
pub mod cache;
pub mod config;
pub mod correlate;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod sync;
pub mod utils;
