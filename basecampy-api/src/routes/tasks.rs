/// Task and subtask endpoints
///
/// Tasks are always looked up within the project named in the path, and
/// subtasks through their task's project, so a role in one project never
/// reaches records of another.
///
/// Task create and update take `multipart/form-data` (or JSON without
/// files). Files sent under `attachments` go through the app's
/// [`FileStorage`](basecampy_shared::storage::FileStorage) and are recorded
/// with the URL, MIME type and size it reports.
///
/// # Endpoints
///
/// | method | path                                           | roles         |
/// |--------|------------------------------------------------|---------------|
/// | GET    | `/api/v1/task/:project_id`                     | ANY_ROLE      |
/// | POST   | `/api/v1/task/:project_id`                     | TASK_MANAGERS |
/// | GET    | `/api/v1/task/:project_id/t/:task_id`          | ANY_ROLE      |
/// | PUT    | `/api/v1/task/:project_id/t/:task_id`          | TASK_MANAGERS |
/// | DELETE | `/api/v1/task/:project_id/t/:task_id`          | TASK_MANAGERS |
/// | POST   | `/api/v1/task/:project_id/t/:task_id/subtasks` | TASK_MANAGERS |
/// | PUT    | `/api/v1/task/:project_id/st/:subtask_id`      | ANY_ROLE      |
/// | DELETE | `/api/v1/task/:project_id/st/:subtask_id`      | TASK_MANAGERS |

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{FormOrJson, PathIds, UploadedFile, ValidatedJson},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use basecampy_shared::{
    auth::{
        authorization::{require_project_role, ANY_ROLE, TASK_MANAGERS},
        middleware::AuthContext,
    },
    models::{
        membership::Membership,
        subtask::{CreateSubtask, Subtask, UpdateSubtask},
        task::{Attachment, CreateTask, Task, TaskDetails, TaskStatus, TaskWithAssignee, UpdateTask},
    },
    storage::StoredFile,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(default, alias = "assignedTo")]
    pub assigned_to: Option<Uuid>,

    #[serde(default)]
    pub status: TaskStatus,
}

/// Update task request (absent fields stay unchanged)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,

    #[serde(default, alias = "assignedTo")]
    pub assigned_to: Option<Uuid>,

    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Create subtask request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubtaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters long"))]
    pub description: Option<String>,

    #[serde(default, alias = "isCompleted")]
    pub is_completed: Option<bool>,
}

/// Update subtask request (absent fields stay unchanged)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubtaskRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[serde(default)]
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters long"))]
    pub description: Option<String>,

    #[serde(default, alias = "isCompleted")]
    pub is_completed: Option<bool>,
}

/// A deleted task and how many subtasks went with it
#[derive(Debug, Serialize)]
pub struct DeletedTask {
    pub task: Task,
    pub subtasks_deleted: u64,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

fn subtask_not_found() -> ApiError {
    ApiError::NotFound("Subtask not found".to_string())
}

/// Form field carrying task attachment files
pub const ATTACHMENTS_FIELD: &str = "attachments";

fn check_upload_fields(files: &[UploadedFile]) -> ApiResult<()> {
    match files.iter().find(|file| file.field != ATTACHMENTS_FIELD) {
        Some(file) => Err(ApiError::invalid_field(
            &file.field,
            format!("Files are only accepted under `{}`", ATTACHMENTS_FIELD),
        )),
        None => Ok(()),
    }
}

/// Stores uploaded files; on failure the ones already stored are removed
async fn store_attachments(state: &AppState, files: Vec<UploadedFile>) -> ApiResult<Vec<StoredFile>> {
    let mut stored = Vec::with_capacity(files.len());

    for file in files {
        match state
            .storage
            .store(&file.file_name, &file.mimetype, file.content)
            .await
        {
            Ok(saved) => stored.push(saved),
            Err(e) => {
                discard_attachments(state, &stored).await;
                return Err(e.into());
            }
        }
    }

    Ok(stored)
}

async fn discard_attachments(state: &AppState, stored: &[StoredFile]) {
    for file in stored {
        if let Err(e) = state.storage.remove(&file.local_path).await {
            tracing::warn!(path = %file.local_path, error = %e, "Failed to remove attachment");
        }
    }
}

fn to_attachment(file: &StoredFile) -> Attachment {
    Attachment {
        url: file.url.clone(),
        mimetype: file.mimetype.clone(),
        size: i64::try_from(file.size).unwrap_or(i64::MAX),
    }
}

/// Assignees must belong to the task's project
async fn check_assignee(state: &AppState, project_id: Uuid, assignee: Option<Uuid>) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if Membership::get_role(&state.db, project_id, user_id).await?.is_none() {
            return Err(ApiError::invalid_field(
                "assigned_to",
                "Assignee must be a member of the project",
            ));
        }
    }
    Ok(())
}

/// Tasks of a project with their assignees
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
) -> ApiResult<ApiResponse<Vec<TaskWithAssignee>>> {
    require_project_role(&state.db, &auth, project_id, ANY_ROLE).await?;

    let tasks = Task::list_with_assignees(&state.db, project_id).await?;
    Ok(ApiResponse::ok(tasks, "Tasks fetched successfully"))
}

/// Creates a task; the caller is recorded as `assigned_by`
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
    FormOrJson { value: req, files }: FormOrJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    require_project_role(&state.db, &auth, project_id, TASK_MANAGERS).await?;
    check_upload_fields(&files)?;
    check_assignee(&state, project_id, req.assigned_to).await?;

    let stored = store_attachments(&state, files).await?;

    let created = Task::create(
        &state.db,
        CreateTask {
            project_id,
            title: req.title.trim().to_string(),
            description: req.description,
            assigned_to: req.assigned_to,
            assigned_by: auth.user_id,
            status: req.status,
            attachments: stored.iter().map(to_attachment).collect(),
        },
    )
    .await;

    let task = match created {
        Ok(task) => task,
        Err(e) => {
            discard_attachments(&state, &stored).await;
            return Err(ApiError::from_insert(e));
        }
    };

    tracing::info!(project_id = %project_id, task_id = %task.id, attachments = stored.len(), "Task created");

    Ok(ApiResponse::created(task, "Task created successfully"))
}

/// One task with its assignee and subtasks
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, task_id)): PathIds<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<TaskDetails>> {
    require_project_role(&state.db, &auth, project_id, ANY_ROLE).await?;

    let details = Task::details(&state.db, project_id, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(ApiResponse::ok(details, "Task fetched successfully"))
}

/// Partially updates a task
///
/// Uploaded files replace the task's attachment list; without files the
/// list stays as it is.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, task_id)): PathIds<(Uuid, Uuid)>,
    FormOrJson { value: req, files }: FormOrJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    require_project_role(&state.db, &auth, project_id, TASK_MANAGERS).await?;
    check_upload_fields(&files)?;
    check_assignee(&state, project_id, req.assigned_to).await?;

    Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    let stored = store_attachments(&state, files).await?;
    let attachments = (!stored.is_empty()).then(|| stored.iter().map(to_attachment).collect());

    let updated = Task::update(
        &state.db,
        project_id,
        task_id,
        UpdateTask {
            title: req.title.map(|title| title.trim().to_string()),
            description: req.description,
            assigned_to: req.assigned_to,
            status: req.status,
            attachments,
        },
    )
    .await;

    let task = match updated {
        Ok(Some(task)) => task,
        Ok(None) => {
            discard_attachments(&state, &stored).await;
            return Err(task_not_found());
        }
        Err(e) => {
            discard_attachments(&state, &stored).await;
            return Err(e.into());
        }
    };

    Ok(ApiResponse::ok(task, "Task updated successfully"))
}

/// Deletes a task and its subtasks
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, task_id)): PathIds<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<DeletedTask>> {
    require_project_role(&state.db, &auth, project_id, TASK_MANAGERS).await?;

    let (task, subtasks_deleted) = Task::delete_with_subtasks(&state.db, project_id, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    tracing::info!(project_id = %project_id, task_id = %task_id, subtasks_deleted, "Task deleted");

    Ok(ApiResponse::ok(
        DeletedTask {
            task,
            subtasks_deleted,
        },
        "Task deleted successfully",
    ))
}

/// Adds a subtask under a task of the project
pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, task_id)): PathIds<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<CreateSubtaskRequest>,
) -> ApiResult<ApiResponse<Subtask>> {
    require_project_role(&state.db, &auth, project_id, TASK_MANAGERS).await?;

    Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    let subtask = Subtask::create(
        &state.db,
        CreateSubtask {
            task_id,
            title: req.title.trim().to_string(),
            description: req.description.map(|d| d.trim().to_string()),
            is_completed: req.is_completed.unwrap_or(false),
            created_by: auth.user_id,
        },
    )
    .await
    .map_err(ApiError::from_insert)?;

    Ok(ApiResponse::created(subtask, "Subtask created successfully"))
}

/// Partially updates a subtask
///
/// Open to every member so anyone can tick a subtask off.
pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, subtask_id)): PathIds<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateSubtaskRequest>,
) -> ApiResult<ApiResponse<Subtask>> {
    require_project_role(&state.db, &auth, project_id, ANY_ROLE).await?;

    let subtask = Subtask::update(
        &state.db,
        project_id,
        subtask_id,
        UpdateSubtask {
            title: req.title.map(|title| title.trim().to_string()),
            description: req.description.map(|d| d.trim().to_string()),
            is_completed: req.is_completed,
        },
    )
    .await?
    .ok_or_else(subtask_not_found)?;

    Ok(ApiResponse::ok(subtask, "Subtask updated successfully"))
}

/// Deletes a subtask
pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, subtask_id)): PathIds<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Subtask>> {
    require_project_role(&state.db, &auth, project_id, TASK_MANAGERS).await?;

    let subtask = Subtask::delete_in_project(&state.db, project_id, subtask_id)
        .await?
        .ok_or_else(subtask_not_found)?;

    Ok(ApiResponse::ok(subtask, "Subtask deleted successfully"))
}
