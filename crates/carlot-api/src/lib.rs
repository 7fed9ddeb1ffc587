//! Async HTTP transport for the carlot marketplace REST API.
//!
//! This crate knows about URLs, bearer tokens, JSON envelopes, and HTTP
//! status codes. It knows nothing about cars, inquiries, or caching; the
//! typed gateway and everything above it lives in `carlot-core`.

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod transport;

pub use auth::{NoToken, StaticToken, TokenSource};
pub use client::ApiClient;
pub use envelope::{Page, Pagination};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
