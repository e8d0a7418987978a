//! Shared plumbing for Barq services: configuration loading, error rendering,
//! health probes, request-id middleware, tracing setup and serde helpers.

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
