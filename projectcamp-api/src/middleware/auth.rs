/// Session authentication middleware
///
/// Validates the access token from the `accessToken` cookie or the
/// `Authorization: Bearer` header, checks that its user still exists and
/// inserts an [`AuthContext`] into the request extensions. Handlers pick it
/// up with `Extension<AuthContext>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use projectcamp_shared::{
    auth::middleware::{authenticate_headers, AuthError},
    models::user::User,
};

use crate::{app::AppState, error::ApiError};

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate_headers(req.headers(), state.jwt_secret())?;

    let exists = User::find_by_id(&state.db, auth.user_id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .is_some();
    if !exists {
        tracing::debug!(user_id = %auth.user_id, "Session token for deleted user");
        return Err(AuthError::UnknownUser.into());
    }

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
