//! Murmur Bridge Server
//!
//! Synchronizes permissions, registrations, and authentication between a
//! host identity platform and a Murmur voice server.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod gateway;
pub mod identity;
pub mod permissions;
pub mod sync;
