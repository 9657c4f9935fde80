/// Project endpoints
///
/// # Endpoints
///
/// - `GET    /api/v1/projects` - Caller's projects with role and member count
/// - `POST   /api/v1/projects` - Create a project, caller becomes admin
/// - `GET    /api/v1/projects/:project_id` - Any member
/// - `PUT    /api/v1/projects/:project_id` - Admin only
/// - `DELETE /api/v1/projects/:project_id` - Admin only

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{read_json, Json},
    response::ApiResponse,
    routes::{require_project_action, tasks::remove_from_media_host},
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
    models::project::{CreateProject, Project, ProjectWithRole, UpdateProject},
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters long"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Update project request
///
/// A `null` description clears it; an absent one leaves it unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters long"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// Distinguishes an absent field (None) from an explicit null (Some(None))
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn trimmed(value: String) -> ApiResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ApiError::invalid_field("name", "Name is required"));
    }
    Ok(value)
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<ProjectWithRole>>> {
    let projects = Project::list_for_user(&state.db, auth.user_id).await?;
    Ok(ApiResponse::ok(projects, "Projects fetched successfully"))
}

/// Creates a project; the caller becomes its admin in the same transaction
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    req.validate()?;

    let project = Project::create_with_admin(
        &state.db,
        CreateProject {
            name: trimmed(req.name)?,
            description: req.description,
            created_by: auth.user_id,
        },
    )
    .await?;

    Ok(ApiResponse::created(project, "Project created successfully"))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Project>> {
    require_project_action(&state, &auth, project_id, ProjectAction::ViewProject).await?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(ApiResponse::ok(project, "Project fetched successfully"))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    request: Request,
) -> ApiResult<ApiResponse<Project>> {
    require_project_action(&state, &auth, project_id, ProjectAction::UpdateProject).await?;
    let req: UpdateProjectRequest = read_json(request, &state).await?;
    req.validate()?;

    let project = Project::update(
        &state.db,
        project_id,
        UpdateProject {
            name: req.name.map(trimmed).transpose()?,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project updated");

    Ok(ApiResponse::ok(project, "Project updated successfully"))
}

/// Deletes a project with its tasks, subtasks, notes and memberships
///
/// Attachment files are removed from the media host first, best effort.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Value>> {
    require_project_action(&state, &auth, project_id, ProjectAction::DeleteProject).await?;

    let media = Project::attachment_public_ids(&state.db, project_id).await?;
    remove_from_media_host(state.media.as_ref(), media).await;

    if !Project::delete(&state.db, project_id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %project_id, user_id = %auth.user_id, "Project deleted");

    Ok(ApiResponse::ok(
        json!({ "id": project_id }),
        "Project deleted successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_description() {
        let absent: UpdateProjectRequest = serde_json::from_str(r#"{"name":"Camp"}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateProjectRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateProjectRequest =
            serde_json::from_str(r#"{"description":"Summer"}"#).unwrap();
        assert_eq!(set.description, Some(Some("Summer".to_string())));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(trimmed("   ".to_string()).is_err());
        assert_eq!(trimmed(" Camp ".to_string()).unwrap(), "Camp");
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateProjectRequest {
            name: String::new(),
            description: None,
        };
        assert!(req.validate().is_err());
    }
}
