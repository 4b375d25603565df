//! API handlers for passgate.

pub mod auth;
pub mod health;
pub mod root;
