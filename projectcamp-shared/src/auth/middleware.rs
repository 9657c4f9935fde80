/// Request authentication context and session token extraction
///
/// The API's authentication layer pulls a session token from the request,
/// validates it and inserts an [`AuthContext`] into the request extensions.
/// Handlers receive it explicitly through Axum's `Extension` extractor and
/// pass the caller's identity down to the authorization checks.
///
/// A session token is accepted from either:
///
/// - `Authorization: Bearer <jwt>`
/// - the `accessToken` cookie (browser sessions)
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use projectcamp_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    /// Creates auth context from validated JWT claims
    pub fn from_jwt(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in header or cookie
    #[error("Unauthorized request")]
    MissingCredentials,

    /// Authorization header present but not a Bearer token
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    /// Token was valid but its user no longer exists
    #[error("Invalid access token")]
    UnknownUser,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            other => (StatusCode::UNAUTHORIZED, other.to_string()).into_response(),
        }
    }
}

/// Reads a cookie value from the `Cookie` request headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Extracts the session token from the `Authorization` header or the
/// `accessToken` cookie, preferring the cookie as browsers send both
pub fn extract_session_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(token) = cookie_value(headers, ACCESS_TOKEN_COOKIE) {
        return Ok(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the request's session token and builds the auth context
///
/// Does not check that the user still exists; the API layer does that
/// against the database.
pub fn authenticate_headers(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = extract_session_token(headers)?;

    let claims = validate_access_token(&token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    Ok(AuthContext::from_jwt(claims.sub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn token_for(user_id: Uuid, token_type: TokenType) -> String {
        create_token(&Claims::new(user_id, token_type), SECRET).unwrap()
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc.def; refreshToken=xyz"),
        );

        assert_eq!(cookie_value(&headers, "accessToken").as_deref(), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "refreshToken").as_deref(), Some("xyz"));
        assert!(cookie_value(&headers, "missing").is_none());
    }

    #[test]
    fn test_empty_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken="));
        assert!(cookie_value(&headers, ACCESS_TOKEN_COOKIE).is_none());
    }

    #[test]
    fn test_authenticate_with_bearer() {
        let user_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token_for(user_id, TokenType::Access)))
                .unwrap(),
        );

        let ctx = authenticate_headers(&headers, SECRET).unwrap();
        assert_eq!(ctx.user_id, user_id);
    }

    #[test]
    fn test_authenticate_with_cookie() {
        let user_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!(
                "accessToken={}",
                token_for(user_id, TokenType::Access)
            ))
            .unwrap(),
        );

        let ctx = authenticate_headers(&headers, SECRET).unwrap();
        assert_eq!(ctx, AuthContext::from_jwt(user_id));
    }

    #[test]
    fn test_authenticate_rejects_missing_and_malformed() {
        let headers = HeaderMap::new();
        assert!(matches!(
            authenticate_headers(&headers, SECRET),
            Err(AuthError::MissingCredentials)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            authenticate_headers(&headers, SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_authenticate_rejects_refresh_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!(
                "Bearer {}",
                token_for(Uuid::new_v4(), TokenType::Refresh)
            ))
            .unwrap(),
        );

        assert!(matches!(
            authenticate_headers(&headers, SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::UnknownUser.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::DatabaseError("x".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
