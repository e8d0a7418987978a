//! sea-orm entities for the tracker service.

pub mod blackouts;
pub mod locations;
pub mod meta;
pub mod sessions;
pub mod users;
