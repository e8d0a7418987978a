//! Auth types shared across Barq services.
//!
//! Provides the session/challenge cookie builders and opaque token generation.

pub mod cookie;
pub mod token;
