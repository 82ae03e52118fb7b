//! # KvLink Shared Library
//!
//! This crate owns the process-wide Redis connection and reports its health.
//!
//! ## Module Organization
//!
//! - `redis`: Connection configuration, the connection factory, and the
//!   shared connection manager (`RedisService`)
//! - `health`: Health indicators and report aggregation

pub mod health;
pub mod redis;

/// Current version of the KvLink shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
