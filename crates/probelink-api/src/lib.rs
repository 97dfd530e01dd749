// probelink-api: Async Rust client for the probe vendor cloud API
// (token endpoint + device telemetry endpoints)

pub mod auth;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use auth::{AuthClient, TokenGrant};
pub use client::{AccessToken, CloudClient};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
