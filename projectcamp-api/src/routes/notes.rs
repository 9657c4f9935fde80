/// Project note endpoints
///
/// Every member can read notes; only admins write them.
///
/// # Endpoints
///
/// - `GET    /api/v1/notes/:project_id`
/// - `POST   /api/v1/notes/:project_id`
/// - `GET    /api/v1/notes/:project_id/n/:note_id`
/// - `PUT    /api/v1/notes/:project_id/n/:note_id`
/// - `DELETE /api/v1/notes/:project_id/n/:note_id`

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
    models::note::{Note, NoteView},
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct NoteRequest {
    #[validate(length(min = 1, max = 10000, message = "Content must be 1 to 10000 characters long"))]
    pub content: String,
}

fn note_not_found() -> ApiError {
    ApiError::NotFound("Note not found".to_string())
}

async fn view(state: &AppState, note: Note) -> ApiResult<NoteView> {
    Note::with_authors(&state.db, vec![note])
        .await?
        .pop()
        .ok_or_else(note_not_found)
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<NoteView>>> {
    require_project_action(&state, &auth, project_id, ProjectAction::ViewNotes).await?;

    let notes = Note::list_by_project(&state.db, project_id).await?;
    let views = Note::with_authors(&state.db, notes).await?;

    Ok(ApiResponse::ok(views, "Notes fetched successfully"))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    request: Request,
) -> ApiResult<ApiResponse<NoteView>> {
    require_project_action(&state, &auth, project_id, ProjectAction::CreateNote).await?;
    let req: NoteRequest = read_json(request, &state).await?;
    req.validate()?;

    let note = Note::create(&state.db, project_id, auth.user_id, req.content).await?;
    tracing::info!(note_id = %note.id, project_id = %project_id, "Note created");

    Ok(ApiResponse::created(view(&state, note).await?, "Note created successfully"))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<NoteView>> {
    require_project_action(&state, &auth, project_id, ProjectAction::ViewNotes).await?;

    let note = Note::find_in_project(&state.db, project_id, note_id)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::ok(view(&state, note).await?, "Note fetched successfully"))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
    request: Request,
) -> ApiResult<ApiResponse<NoteView>> {
    require_project_action(&state, &auth, project_id, ProjectAction::UpdateNote).await?;
    let req: NoteRequest = read_json(request, &state).await?;
    Note::find_in_project(&state.db, project_id, note_id)
        .await?
        .ok_or_else(note_not_found)?;
    req.validate()?;

    let note = Note::update(&state.db, note_id, req.content)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::ok(view(&state, note).await?, "Note updated successfully"))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    require_project_action(&state, &auth, project_id, ProjectAction::DeleteNote).await?;
    Note::find_in_project(&state.db, project_id, note_id)
        .await?
        .ok_or_else(note_not_found)?;

    Note::delete(&state.db, note_id)
        .await?
        .ok_or_else(note_not_found)?;

    tracing::info!(note_id = %note_id, project_id = %project_id, "Note deleted");

    Ok(ApiResponse::ok(json!({ "id": note_id }), "Note deleted successfully"))
}
