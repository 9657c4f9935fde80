/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/auth/register` - Register a new user
/// - `POST /api/v1/auth/login` - Login, sets session cookies
/// - `POST /api/v1/auth/logout` - Logout, clears session cookies (session)
/// - `POST /api/v1/auth/refresh-token` - Rotate the token pair
/// - `GET  /api/v1/auth/current-user` - Caller's profile (session)
/// - `POST /api/v1/auth/change-password` - Change password (session)
/// - `GET  /api/v1/auth/verify-email/:token` - Confirm email address
/// - `POST /api/v1/auth/resend-email-verification` - New verification token (session)
/// - `POST /api/v1/auth/forgot-password` - Request a reset token
/// - `POST /api/v1/auth/reset-password/:token` - Reset password with a token
///
/// Login and refresh return the tokens in the body and also set them as
/// `HttpOnly` cookies.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Json,
    mail,
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::AppendHeaders,
    Extension,
};
use projectcamp_shared::{
    auth::{
        jwt::{self, TokenPair, TokenType},
        middleware::{cookie_value, AuthContext, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
        password, token,
    },
    models::user::{CreateUser, UpdateUser, User},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

/// Two `Set-Cookie` headers
type SessionCookies = AppendHeaders<[(header::HeaderName, String); 2]>;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters long"),
        custom(function = "validate_username")
    )]
    pub username: String,

    pub password: String,

    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Refresh request; the token may come from the cookie instead
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    pub new_password: String,
}

/// Forgot password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
}

/// Reset password request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().any(|c| c.is_uppercase()) {
        let mut err = ValidationError::new("lowercase");
        err.message = Some("Username must be in lower case".into());
        return Err(err);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        let mut err = ValidationError::new("charset");
        err.message = Some("Username may only contain letters, digits, '_', '-' and '.'".into());
        return Err(err);
    }

    Ok(())
}

fn check_password_strength(field: &str, candidate: &str) -> ApiResult<()> {
    password::validate_password_strength(candidate).map_err(|e| ApiError::invalid_field(field, e))
}

fn session_cookie(name: &str, value: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn session_cookies(tokens: &TokenPair, secure: bool) -> SessionCookies {
    AppendHeaders([
        (
            header::SET_COOKIE,
            session_cookie(
                ACCESS_TOKEN_COOKIE,
                &tokens.access_token,
                TokenType::Access.default_expiration().num_seconds(),
                secure,
            ),
        ),
        (
            header::SET_COOKIE,
            session_cookie(
                REFRESH_TOKEN_COOKIE,
                &tokens.refresh_token,
                TokenType::Refresh.default_expiration().num_seconds(),
                secure,
            ),
        ),
    ])
}

fn cleared_cookies(secure: bool) -> SessionCookies {
    AppendHeaders([
        (header::SET_COOKIE, session_cookie(ACCESS_TOKEN_COOKIE, "", 0, secure)),
        (header::SET_COOKIE, session_cookie(REFRESH_TOKEN_COOKIE, "", 0, secure)),
    ])
}

/// Issues a token pair and records the refresh token's hash on the user
async fn start_session(state: &AppState, user_id: uuid::Uuid) -> ApiResult<TokenPair> {
    let tokens = jwt::issue_token_pair(user_id, state.jwt_secret())?;
    let refresh_hash = token::hash_token(&tokens.refresh_token);
    User::set_refresh_token_hash(&state.db, user_id, Some(&refresh_hash)).await?;
    Ok(tokens)
}

async fn current(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))
}

/// Register a new user
///
/// Stores a hashed email verification token and mails the plaintext one.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email or username already taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<User>> {
    req.validate()?;
    check_password_strength("password", &req.password)?;

    if User::exists_by_email_or_username(&state.db, &req.email, &req.username).await? {
        return Err(ApiError::Conflict(
            "User with email or username already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            username: req.username,
            full_name: req.full_name.filter(|n| !n.trim().is_empty()),
            password_hash,
        },
    )
    .await?;

    let verification = token::generate_temporary_token();
    User::set_email_verification_token(&state.db, user.id, &verification.hash, verification.expires_at)
        .await?;
    mail::send_email_verification(&state.config.api, &user, &verification.plaintext);

    tracing::info!(user_id = %user.id, "User registered");

    Ok(ApiResponse::created(
        user,
        "User registered successfully and verification email has been sent on your email",
    ))
}

/// Login with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(SessionCookies, ApiResponse<LoginResponse>)> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(invalid());
    }

    let tokens = start_session(&state, user.id).await?;
    let cookies = session_cookies(&tokens, state.config.api.production);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        cookies,
        ApiResponse::ok(LoginResponse { user, tokens }, "User logged in successfully"),
    ))
}

/// Ends the session: forgets the refresh token and clears the cookies
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<(SessionCookies, ApiResponse<Value>)> {
    User::set_refresh_token_hash(&state.db, auth.user_id, None).await?;

    tracing::info!(user_id = %auth.user_id, "User logged out");

    Ok((
        cleared_cookies(state.config.api.production),
        ApiResponse::ok(json!({}), "User logged out"),
    ))
}

/// Exchanges a refresh token for a new pair
///
/// The presented token must match the one issued last; the old one stops
/// working once rotated.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, expired or already-rotated token
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(SessionCookies, ApiResponse<TokenPair>)> {
    let presented = cookie_value(&headers, REFRESH_TOKEN_COOKIE)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized access".to_string()))?;

    let claims = jwt::validate_refresh_token(&presented, state.jwt_secret())
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let matches = user
        .refresh_token_hash
        .as_deref()
        .is_some_and(|stored| token::verify_token(&presented, stored));
    if !matches {
        tracing::warn!(user_id = %user.id, "Refresh token reuse or stale token");
        return Err(ApiError::Unauthorized(
            "Refresh token is expired or used".to_string(),
        ));
    }

    let tokens = start_session(&state, user.id).await?;
    let cookies = session_cookies(&tokens, state.config.api.production);

    Ok((cookies, ApiResponse::ok(tokens, "Access token refreshed")))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<User>> {
    let user = current(&state, &auth).await?;
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}

/// Changes the caller's password after checking the old one
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    let user = current(&state, &auth).await?;

    if !password::verify_password(&req.old_password, &user.password_hash)? {
        return Err(ApiError::invalid_field("oldPassword", "Invalid old password"));
    }
    check_password_strength("newPassword", &req.new_password)?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::update(
        &state.db,
        user.id,
        UpdateUser {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )
    .await?;
    User::set_refresh_token_hash(&state.db, user.id, None).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

/// Confirms an email address with the token from the verification mail
///
/// # Errors
///
/// - `400 Bad Request`: Unknown, used or expired token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(verification_token): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let invalid = || ApiError::BadRequest("Token is invalid or expired".to_string());

    if !token::validate_token_format(&verification_token) {
        return Err(invalid());
    }

    let user = User::verify_email(&state.db, &token::hash_token(&verification_token))
        .await?
        .ok_or_else(invalid)?;

    tracing::info!(user_id = %user.id, "Email verified");

    Ok(ApiResponse::ok(
        json!({ "isEmailVerified": true }),
        "Email is verified",
    ))
}

/// Issues a fresh verification token for the caller
///
/// # Errors
///
/// - `409 Conflict`: Email already verified
pub async fn resend_email_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Value>> {
    let user = current(&state, &auth).await?;

    if user.is_email_verified {
        return Err(ApiError::Conflict("Email is already verified".to_string()));
    }

    let verification = token::generate_temporary_token();
    User::set_email_verification_token(&state.db, user.id, &verification.hash, verification.expires_at)
        .await?;
    mail::send_email_verification(&state.config.api, &user, &verification.plaintext);

    Ok(ApiResponse::ok(
        json!({}),
        "Mail has been sent to your email ID",
    ))
}

/// Starts a password reset for the account with this email
///
/// # Errors
///
/// - `404 Not Found`: No account with this email
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    let reset = token::generate_temporary_token();
    User::set_forgot_password_token(&state.db, user.id, &reset.hash, reset.expires_at).await?;
    mail::send_password_reset(&state.config.api, &user, &reset.plaintext);

    Ok(ApiResponse::ok(
        json!({}),
        "Password reset mail has been sent on your mail id",
    ))
}

/// Sets a new password using the token from the reset mail
///
/// Existing refresh tokens stop working.
///
/// # Errors
///
/// - `400 Bad Request`: Weak password, or unknown/expired token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let invalid = || ApiError::BadRequest("Token is invalid or expired".to_string());

    if !token::validate_token_format(&reset_token) {
        return Err(invalid());
    }
    check_password_strength("newPassword", &req.new_password)?;

    let password_hash = password::hash_password(&req.new_password)?;
    let user = User::reset_password(&state.db, &token::hash_token(&reset_token), &password_hash)
        .await?
        .ok_or_else(invalid)?;

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(ApiResponse::ok(json!({}), "Password reset successfully"))
}
