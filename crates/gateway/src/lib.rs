//! HTTP surface of the plugin service.
//!
//! Exposes the registry catalog and transform dispatch as JSON routes:
//! - `GET /health`
//! - `GET /entities` and `GET /entities/{name}`
//! - `GET /entities/{name}/transforms`
//! - `POST /entities/{name}/transforms/{transform}`
//! - `POST /refresh`

pub mod error;
pub mod server;
pub mod state;

pub use {
    error::ApiError,
    server::{build_app, start_server},
    state::GatewayState,
};
