/// Task, subtask and attachment endpoints
///
/// # Endpoints
///
/// - `GET    /api/v1/tasks/:project_id` - Any member
/// - `POST   /api/v1/tasks/:project_id` - Admin, project admin; JSON or
///   multipart with up to 10 `attachments` files
/// - `GET    /api/v1/tasks/:project_id/t/:task_id` - Any member
/// - `PUT    /api/v1/tasks/:project_id/t/:task_id` - Admin, project admin;
///   multipart may carry one `attachment` file, appended to the task
/// - `DELETE /api/v1/tasks/:project_id/t/:task_id` - Admin, project admin
/// - `POST   /api/v1/tasks/:project_id/t/:task_id/subtasks` - Admin, project admin
/// - `PUT    /api/v1/tasks/:project_id/st/:subtask_id` - Any member
/// - `DELETE /api/v1/tasks/:project_id/st/:subtask_id` - Admin, project admin
/// - `DELETE /api/v1/tasks/:project_id/t/:task_id/attachments/:attachment_id` -
///   Admin, project admin or the task's assignor
///
/// Files go to the media host before the database write. When the write
/// fails, the uploaded files are removed again.

use crate::{
    app::AppState,
    config::MAX_ATTACHMENTS_PER_TASK,
    error::{ApiError, ApiResult},
    extract::{read_json, FormWithFiles},
    response::ApiResponse,
    routes::{projects::double_option, require_project_action},
};
use axum::{
    extract::{Path, Request, State},
    Extension,
};
use futures::future::join_all;
use projectcamp_shared::{
    auth::{
        authorization::{require_attachment_delete, ProjectAction},
        middleware::AuthContext,
    },
    media::{public_id_from_url, MediaStore, UploadFile},
    models::{
        membership::Membership,
        subtask::{CreateSubtask, Subtask, UpdateSubtask},
        task::{
            Attachment, CreateTask, NewAttachment, Task, TaskDetail, TaskStatus,
            TaskWithAttachments, UpdateTask,
        },
    },
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

/// Create task fields (JSON body or multipart text fields)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters long"))]
    pub title: String,

    pub description: Option<String>,

    pub assigned_to: Option<Uuid>,

    #[serde(default)]
    pub status: TaskStatus,
}

/// Update task fields; absent fields are left unchanged, a `null`
/// description or assignee clears it
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters long"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubtaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters long"))]
    pub title: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubtaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters long"))]
    pub title: Option<String>,

    pub is_completed: Option<bool>,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

fn subtask_not_found() -> ApiError {
    ApiError::NotFound("Subtask not found".to_string())
}

async fn find_task(state: &AppState, project_id: Uuid, task_id: Uuid) -> ApiResult<Task> {
    Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(task_not_found)
}

/// Assignees must belong to the project
async fn check_assignee(state: &AppState, project_id: Uuid, assignee: Option<Uuid>) -> ApiResult<()> {
    let Some(user_id) = assignee else {
        return Ok(());
    };

    if !Membership::is_member(&state.db, project_id, user_id).await? {
        return Err(ApiError::invalid_field(
            "assignedTo",
            "Assignee must be a member of the project",
        ));
    }

    Ok(())
}

/// Uploads files concurrently
///
/// On any failure the files that did upload are removed again and the first
/// error is returned.
async fn upload_all(state: &AppState, files: &[UploadFile]) -> ApiResult<Vec<NewAttachment>> {
    let folder = state.config.uploads.folder.as_str();
    let results = join_all(files.iter().map(|file| state.media.upload(file, folder))).await;

    let mut uploaded = Vec::with_capacity(files.len());
    let mut first_error = None;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(stored) => uploaded.push(stored.into_attachment(file)),
            Err(e) => {
                tracing::warn!(file_name = %file.file_name, error = %e, "Attachment upload failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(err) = first_error {
        discard_uploads(state, &uploaded).await;
        return Err(err.into());
    }

    Ok(uploaded)
}

async fn discard_uploads(state: &AppState, uploaded: &[NewAttachment]) {
    let targets = uploaded
        .iter()
        .map(|a| (a.public_id.clone(), a.resource_type.clone()))
        .collect();
    remove_from_media_host(state.media.as_ref(), targets).await;
}

/// Media-host identifiers of attachments, recovering the id from the URL for
/// records stored without one
fn media_targets(attachments: &[Attachment]) -> Vec<(String, String)> {
    attachments
        .iter()
        .filter_map(|a| {
            a.public_id
                .clone()
                .or_else(|| public_id_from_url(&a.url))
                .map(|id| (id, a.resource_type.clone()))
        })
        .collect()
}

/// Deletes files from the media host concurrently, logging failures
///
/// Never fails: database records are removed whether or not the host
/// cooperated.
pub(crate) async fn remove_from_media_host(media: &dyn MediaStore, targets: Vec<(String, String)>) {
    if targets.is_empty() {
        return;
    }

    let results = join_all(
        targets
            .iter()
            .map(|(public_id, resource_type)| media.delete(public_id, resource_type)),
    )
    .await;

    for ((public_id, _), result) in targets.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!(public_id = %public_id, error = %e, "Failed to delete attachment from media host");
        }
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<TaskDetail>>> {
    require_project_action(&state, &auth, project_id, ProjectAction::ViewTasks).await?;

    let tasks = Task::list_by_project(&state.db, project_id).await?;
    let details = Task::details(&state.db, tasks).await?;

    Ok(ApiResponse::ok(details, "Tasks fetched successfully"))
}

/// Creates a task, uploading any `attachments` files first
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields, non-member assignee, too many or too
///   large files
/// - `403 Forbidden`: Not a member, or role not allowed
/// - `500 Internal Server Error`: Media host failure
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    request: Request,
) -> ApiResult<ApiResponse<TaskWithAttachments>> {
    require_project_action(&state, &auth, project_id, ProjectAction::CreateTask).await?;
    let mut form = FormWithFiles::<CreateTaskRequest>::read(request, &state).await?;

    form.fields.validate()?;
    let files = form.take_files("attachments", MAX_ATTACHMENTS_PER_TASK)?;
    let req = form.fields;
    check_assignee(&state, project_id, req.assigned_to).await?;

    let uploaded = upload_all(&state, &files).await?;

    let created = Task::create(
        &state.db,
        CreateTask {
            project_id,
            title: req.title.trim().to_string(),
            description: req.description,
            assigned_to: req.assigned_to,
            assigned_by: auth.user_id,
            status: req.status,
        },
        uploaded.clone(),
    )
    .await;

    let (task, attachments) = match created {
        Ok(created) => created,
        Err(e) => {
            discard_uploads(&state, &uploaded).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        task_id = %task.id,
        project_id = %project_id,
        attachments = attachments.len(),
        "Task created"
    );

    Ok(ApiResponse::created(
        TaskWithAttachments { task, attachments },
        "Task created successfully",
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<TaskDetail>> {
    require_project_action(&state, &auth, project_id, ProjectAction::ViewTasks).await?;

    let task = find_task(&state, project_id, task_id).await?;
    let detail = Task::details(&state.db, vec![task])
        .await?
        .pop()
        .ok_or_else(task_not_found)?;

    Ok(ApiResponse::ok(detail, "Task fetched successfully"))
}

/// Updates task fields; a multipart `attachment` file is appended
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    request: Request,
) -> ApiResult<ApiResponse<TaskWithAttachments>> {
    require_project_action(&state, &auth, project_id, ProjectAction::UpdateTask).await?;
    let mut form = FormWithFiles::<UpdateTaskRequest>::read(request, &state).await?;
    find_task(&state, project_id, task_id).await?;

    form.fields.validate()?;
    let files = form.take_files("attachment", 1)?;
    let req = form.fields;
    check_assignee(&state, project_id, req.assigned_to.flatten()).await?;

    let attachment = upload_all(&state, &files).await?.pop();

    let updated = Task::update(
        &state.db,
        task_id,
        UpdateTask {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            status: req.status,
            assigned_to: req.assigned_to,
        },
        attachment.clone(),
    )
    .await;

    let task = match updated {
        Ok(Some(task)) => task,
        Ok(None) => {
            discard_uploads(&state, attachment.as_slice()).await;
            return Err(task_not_found());
        }
        Err(e) => {
            discard_uploads(&state, attachment.as_slice()).await;
            return Err(e.into());
        }
    };

    let attachments = Attachment::list_by_task(&state.db, task.id).await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task updated");

    Ok(ApiResponse::ok(
        TaskWithAttachments { task, attachments },
        "Task updated successfully",
    ))
}

/// Deletes a task with its subtasks and attachments
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    require_project_action(&state, &auth, project_id, ProjectAction::DeleteTask).await?;
    find_task(&state, project_id, task_id).await?;

    let attachments = Attachment::list_by_task(&state.db, task_id).await?;
    remove_from_media_host(state.media.as_ref(), media_targets(&attachments)).await;

    Task::delete(&state.db, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    tracing::info!(task_id = %task_id, project_id = %project_id, "Task deleted");

    Ok(ApiResponse::ok(json!({ "id": task_id }), "Task deleted successfully"))
}

pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    request: Request,
) -> ApiResult<ApiResponse<Subtask>> {
    require_project_action(&state, &auth, project_id, ProjectAction::CreateSubtask).await?;
    let req: CreateSubtaskRequest = read_json(request, &state).await?;
    find_task(&state, project_id, task_id).await?;
    req.validate()?;

    let subtask = Subtask::create(
        &state.db,
        CreateSubtask {
            task_id,
            title: req.title.trim().to_string(),
            created_by: auth.user_id,
        },
    )
    .await?;

    Ok(ApiResponse::created(subtask, "Subtask created successfully"))
}

/// Updates a subtask's title or completion; open to every member
pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, subtask_id)): Path<(Uuid, Uuid)>,
    request: Request,
) -> ApiResult<ApiResponse<Subtask>> {
    require_project_action(&state, &auth, project_id, ProjectAction::UpdateSubtask).await?;
    let req: UpdateSubtaskRequest = read_json(request, &state).await?;
    Subtask::find_in_project(&state.db, project_id, subtask_id)
        .await?
        .ok_or_else(subtask_not_found)?;
    req.validate()?;

    let subtask = Subtask::update(
        &state.db,
        subtask_id,
        UpdateSubtask {
            title: req.title.map(|t| t.trim().to_string()),
            is_completed: req.is_completed,
        },
    )
    .await?
    .ok_or_else(subtask_not_found)?;

    Ok(ApiResponse::ok(subtask, "Subtask updated successfully"))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, subtask_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    require_project_action(&state, &auth, project_id, ProjectAction::DeleteSubtask).await?;
    Subtask::find_in_project(&state.db, project_id, subtask_id)
        .await?
        .ok_or_else(subtask_not_found)?;

    Subtask::delete(&state.db, subtask_id)
        .await?
        .ok_or_else(subtask_not_found)?;

    Ok(ApiResponse::ok(
        json!({ "id": subtask_id }),
        "Subtask deleted successfully",
    ))
}

/// Removes one attachment from a task
///
/// Allowed for admins, project admins and the task's assignor. The media
/// host copy is deleted best effort; the record is removed regardless.
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id, attachment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    require_project_action(&state, &auth, project_id, ProjectAction::ViewTasks).await?;
    let task = find_task(&state, project_id, task_id).await?;
    require_attachment_delete(&state.db, &auth, project_id, task.assigned_by).await?;

    let attachment = Attachment::find_in_task(&state.db, task_id, attachment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Attachment not found".to_string()))?;

    remove_from_media_host(
        state.media.as_ref(),
        media_targets(std::slice::from_ref(&attachment)),
    )
    .await;

    Attachment::delete(&state.db, attachment.id).await?;

    tracing::info!(
        attachment_id = %attachment.id,
        task_id = %task_id,
        user_id = %auth.user_id,
        "Attachment deleted"
    );

    Ok(ApiResponse::ok(
        json!({ "id": attachment.id }),
        "Attachment deleted successfully",
    ))
}
