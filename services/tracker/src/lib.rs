pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod infra;
pub mod router;
pub mod state;
pub mod tasks;
pub mod usecase;
