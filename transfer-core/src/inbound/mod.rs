//! Inbound HTTP adapter.

pub mod handlers;
mod server;

pub use server::HttpServer;
