//! # Project Camp Shared Library
//!
//! Domain types, persistence and access control used by the Project Camp API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `auth`: passwords, session tokens, request auth context, project role checks
//! - `db`: connection pool and migrations
//! - `media`: attachment storage on an external media host

pub mod auth;
pub mod db;
pub mod media;
pub mod models;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
