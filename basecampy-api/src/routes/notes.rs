/// Project note endpoints
///
/// Any member can read notes; only project admins write them.
///
/// - `GET    /api/v1/note/:project_id` - Notes, newest first
/// - `POST   /api/v1/note/:project_id` - Create a note
/// - `GET    /api/v1/note/:project_id/n/:note_id` - One note
/// - `PUT    /api/v1/note/:project_id/n/:note_id` - Replace a note's content
/// - `DELETE /api/v1/note/:project_id/n/:note_id` - Delete a note

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{PathIds, ValidatedJson},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use basecampy_shared::{
    auth::{
        authorization::{require_project_role, ADMINS, ANY_ROLE},
        middleware::AuthContext,
    },
    models::note::{Note, NoteWithCreator, MAX_CONTENT_LEN, MIN_CONTENT_LEN},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Note body for create and update
#[derive(Debug, Deserialize, Validate)]
pub struct NoteRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

impl NoteRequest {
    /// Trimmed content within the allowed length
    fn content(&self) -> ApiResult<&str> {
        let content = self.content.trim();
        let len = content.chars().count() as u64;

        if !(MIN_CONTENT_LEN..=MAX_CONTENT_LEN).contains(&len) {
            return Err(ApiError::invalid_field(
                "content",
                format!(
                    "Content must be between {} and {} characters long",
                    MIN_CONTENT_LEN, MAX_CONTENT_LEN
                ),
            ));
        }

        Ok(content)
    }
}

fn note_not_found() -> ApiError {
    ApiError::NotFound("Note not found".to_string())
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
) -> ApiResult<ApiResponse<Vec<NoteWithCreator>>> {
    require_project_role(&state.db, &auth, project_id, ANY_ROLE).await?;

    let notes = Note::list_by_project(&state.db, project_id).await?;
    Ok(ApiResponse::ok(notes, "Project notes fetched successfully"))
}

/// Creates a note (200, not 201)
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
    ValidatedJson(req): ValidatedJson<NoteRequest>,
) -> ApiResult<ApiResponse<Note>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let note = Note::create(&state.db, project_id, auth.user_id, req.content()?)
        .await
        .map_err(ApiError::from_insert)?;

    tracing::info!(project_id = %project_id, note_id = %note.id, "Note created");

    Ok(ApiResponse::ok(note, "Note created successfully"))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, note_id)): PathIds<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<NoteWithCreator>> {
    require_project_role(&state.db, &auth, project_id, ANY_ROLE).await?;

    let note = Note::find_in_project(&state.db, project_id, note_id)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::ok(note, "Note details fetched successfully"))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, note_id)): PathIds<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<NoteRequest>,
) -> ApiResult<ApiResponse<Note>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let note = Note::update(&state.db, project_id, note_id, req.content()?)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::ok(note, "Note updated successfully"))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, note_id)): PathIds<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Note>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let note = Note::delete_in_project(&state.db, project_id, note_id)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::ok(note, "Note deleted successfully"))
}
