/// Middleware modules for the API server
///
/// - `security`: OWASP security headers
/// - `auth`: session authentication for protected routes

pub mod auth;
pub mod security;
