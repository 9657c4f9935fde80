/// Project membership endpoints
///
/// # Endpoints
///
/// - `GET    /api/v1/projects/:project_id/members` - Any member
/// - `POST   /api/v1/projects/:project_id/members` - Admin only, add by email
/// - `PUT    /api/v1/projects/:project_id/members/:user_id` - Admin only
/// - `DELETE /api/v1/projects/:project_id/members/:user_id` - Admin only

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::read_json,
    response::ApiResponse,
    routes::require_project_action,
};
use axum::{
    extract::{Path, Request, State},
    Extension,
};
use projectcamp_shared::{
    auth::{
        authorization::ProjectAction,
        middleware::AuthContext,
    },
    models::{
        membership::{CreateMembership, MemberWithUser, Membership, ProjectRole},
        user::User,
    },
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

/// Add member request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    /// Defaults to `member`
    #[serde(default)]
    pub role: ProjectRole,
}

/// Change role request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: ProjectRole,
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<MemberWithUser>>> {
    require_project_action(&state, &auth, project_id, ProjectAction::ListMembers).await?;

    let members = Membership::list_with_users(&state.db, project_id).await?;
    Ok(ApiResponse::ok(members, "Project members fetched successfully"))
}

/// Adds an existing user to the project
///
/// # Errors
///
/// - `404 Not Found`: No user with this email
/// - `409 Conflict`: Already a member
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    request: Request,
) -> ApiResult<ApiResponse<Membership>> {
    require_project_action(&state, &auth, project_id, ProjectAction::AddMember).await?;
    let req: AddMemberRequest = read_json(request, &state).await?;
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if Membership::is_member(&state.db, project_id, user.id).await? {
        return Err(ApiError::Conflict(
            "User is already a member of this project".to_string(),
        ));
    }

    let membership = Membership::create(
        &state.db,
        CreateMembership {
            project_id,
            user_id: user.id,
            role: req.role,
        },
    )
    .await?;

    tracing::info!(
        project_id = %project_id,
        user_id = %user.id,
        role = %membership.role,
        added_by = %auth.user_id,
        "Member added"
    );

    Ok(ApiResponse::created(membership, "Member added successfully"))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    request: Request,
) -> ApiResult<ApiResponse<Membership>> {
    require_project_action(&state, &auth, project_id, ProjectAction::UpdateMemberRole).await?;
    let req: UpdateMemberRoleRequest = read_json(request, &state).await?;

    let membership = Membership::update_role(&state.db, project_id, user_id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project member not found".to_string()))?;

    tracing::info!(
        project_id = %project_id,
        user_id = %user_id,
        role = %membership.role,
        "Member role updated"
    );

    Ok(ApiResponse::ok(membership, "Member role updated successfully"))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    require_project_action(&state, &auth, project_id, ProjectAction::RemoveMember).await?;

    if !Membership::delete(&state.db, project_id, user_id).await? {
        return Err(ApiError::NotFound("Project member not found".to_string()));
    }

    tracing::info!(project_id = %project_id, user_id = %user_id, "Member removed");

    Ok(ApiResponse::ok(
        json!({ "userId": user_id }),
        "Member removed successfully",
    ))
}
