/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, sessions, email verification, password reset
/// - `projects`: Project CRUD
/// - `members`: Project membership management
/// - `tasks`: Tasks, subtasks and task attachments
/// - `notes`: Project notes

pub mod auth;
pub mod health;
pub mod members;
pub mod notes;
pub mod projects;
pub mod tasks;

use projectcamp_shared::{
    auth::{
        authorization::{require_action, AuthzError, ProjectAction},
        middleware::AuthContext,
    },
    models::{membership::Membership, project::Project},
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Checks the caller may perform `action` on the project
///
/// A project that doesn't exist is reported as not found rather than as a
/// missing membership.
pub(crate) async fn require_project_action(
    state: &AppState,
    auth: &AuthContext,
    project_id: Uuid,
    action: ProjectAction,
) -> ApiResult<Membership> {
    let err = match require_action(&state.db, auth, project_id, action).await {
        Ok(membership) => return Ok(membership),
        Err(err) => err,
    };

    if matches!(err, AuthzError::NotAMember(_))
        && Project::find_by_id(&state.db, project_id).await?.is_none()
    {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    Err(err.into())
}
