//! HTTP server for the Connexio sync relay.
//!
//! Exposes the shared current item, file uploads and downloads, and saved
//! slots over a small JSON API with permissive CORS for browser clients.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::SharedStore;
pub use server::ConnexioServer;
