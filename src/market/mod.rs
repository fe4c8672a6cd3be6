//! Marketplace access.
//!
//! Session bootstrapping, GraphQL payloads and the catalog query client
//! used by the detail fan-out.

pub mod client;
pub mod error;
pub mod queries;
pub mod session;

#[cfg(test)]
mod test_server;

pub use client::MarketClient;
pub use error::CatalogError;
