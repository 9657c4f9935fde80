//! # Project Camp API Server Library
//!
//! HTTP layer of Project Camp: routing, session authentication, request
//! validation and the response envelope. Persistence and access rules live
//! in `projectcamp-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `response`: Success envelope
//! - `extract`: JSON-or-multipart body extractor for file uploads
//! - `mail`: Account mail (logged)
//! - `middleware`: Security headers and session authentication
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod response;
pub mod routes;
