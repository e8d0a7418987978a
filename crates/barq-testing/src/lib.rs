//! Test utilities for Barq services.
//!
//! Provides a wiremock stand-in for the provider APIs, provider payload
//! builders, and cookie header helpers. Use from tests only.

pub mod auth;
pub mod fixture;
pub mod provider;
