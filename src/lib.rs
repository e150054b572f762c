//! Library exports for authsync, shared between the binary and tests.

pub mod config;
pub mod coordinator;
pub mod models;
pub mod providers;
pub mod routes;
pub mod startup;
pub mod state;
pub mod utils;
