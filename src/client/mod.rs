//! The shared cache registry.
//!
//! One [`QueryClient`] per process is created lazily by
//! [`QueryClient::shared`] and reused by every island that is not given a
//! client of its own.

#[allow(clippy::module_inception)]
mod client;

pub use client::QueryClient;
