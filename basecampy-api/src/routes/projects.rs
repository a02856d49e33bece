/// Project and membership endpoints
///
/// Every route is authenticated. Routes on a single project check the
/// caller's role in that project first.
///
/// # Endpoints
///
/// | method | path                                    | roles      |
/// |--------|-----------------------------------------|------------|
/// | GET    | `/api/v1/project`                       | any caller |
/// | POST   | `/api/v1/project`                       | any caller |
/// | GET    | `/api/v1/project/:project_id`           | ANY_ROLE   |
/// | PUT    | `/api/v1/project/:project_id`           | ADMINS     |
/// | DELETE | `/api/v1/project/:project_id`           | ADMINS     |
/// | GET    | `/api/v1/project/:project_id/members`   | ANY_ROLE   |
/// | POST   | `/api/v1/project/:project_id/members`   | ADMINS     |
/// | PUT    | `/api/v1/project/:project_id/members/:user_id` | ADMINS |
/// | DELETE | `/api/v1/project/:project_id/members/:user_id` | ADMINS |

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
    cascade::{self, CascadeReport},
    models::{
        membership::{Membership, ProjectMember, ProjectRole},
        project::{CreateProject, Project, ProjectListing, UpdateProject},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Update project request (absent fields stay unchanged)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Add member request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    pub role: ProjectRole,
}

/// Change role request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMemberRoleRequest {
    #[serde(alias = "newRole")]
    pub role: ProjectRole,
}

/// A project with the caller's role in it
#[derive(Debug, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub role: ProjectRole,
}

/// A deleted project and what went with it
#[derive(Debug, Serialize)]
pub struct DeletedProject {
    pub project: Project,
    pub deleted: CascadeReport,
}

fn project_not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

fn member_not_found() -> ApiError {
    ApiError::NotFound("Project member not found".to_string())
}

fn trimmed_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_field("name", "Name is required"));
    }
    Ok(name.to_string())
}

/// Projects the caller belongs to, with role and member count
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<ProjectListing>>> {
    let projects = Project::list_for_user(&state.db, auth.user_id).await?;
    Ok(ApiResponse::ok(projects, "Projects fetched successfully"))
}

/// Creates a project; the caller becomes its admin
///
/// # Errors
///
/// - `409 Conflict`: Name already taken
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    let project = Project::create(
        &state.db,
        CreateProject {
            name: trimmed_name(&req.name)?,
            description: req.description,
            created_by: auth.user_id,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    Ok(ApiResponse::created(project, "Project created successfully"))
}

/// Fetches one project
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
) -> ApiResult<ApiResponse<ProjectView>> {
    let role = require_project_role(&state.db, &auth, project_id, ANY_ROLE).await?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(project_not_found)?;

    Ok(ApiResponse::ok(
        ProjectView { project, role },
        "Project fetched successfully",
    ))
}

/// Updates name and/or description
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let name = req.name.as_deref().map(trimmed_name).transpose()?;

    let project = Project::update(
        &state.db,
        project_id,
        UpdateProject {
            name,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(project_not_found)?;

    Ok(ApiResponse::ok(project, "Project updated successfully"))
}

/// Deletes a project with its members, tasks, subtasks and notes
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
) -> ApiResult<ApiResponse<DeletedProject>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let (project, deleted) = cascade::delete_project(&state.db, project_id)
        .await?
        .ok_or_else(project_not_found)?;

    Ok(ApiResponse::ok(
        DeletedProject { project, deleted },
        "Project and all related tasks, subtasks, notes, and members deleted successfully",
    ))
}

/// Members of a project with their public user fields
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
) -> ApiResult<ApiResponse<Vec<ProjectMember>>> {
    require_project_role(&state.db, &auth, project_id, ANY_ROLE).await?;

    let members = Membership::list_members(&state.db, project_id).await?;
    Ok(ApiResponse::ok(members, "Project members fetched successfully"))
}

/// Adds a user by email, or overwrites their role if already a member
///
/// # Errors
///
/// - `404 Not Found`: No user with that email
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds(project_id): PathIds<Uuid>,
    ValidatedJson(req): ValidatedJson<AddMemberRequest>,
) -> ApiResult<ApiResponse<Membership>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    let membership = Membership::upsert(&state.db, project_id, user.id, req.role)
        .await
        .map_err(ApiError::from_insert)?;

    tracing::info!(
        project_id = %project_id,
        user_id = %user.id,
        role = %membership.role,
        added_by = %auth.user_id,
        "Project member added"
    );

    Ok(ApiResponse::created(membership, "Project member added successfully"))
}

/// Changes a member's role
///
/// # Errors
///
/// - `404 Not Found`: The user is not a member
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, user_id)): PathIds<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateMemberRoleRequest>,
) -> ApiResult<ApiResponse<Membership>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let membership = Membership::update_role(&state.db, project_id, user_id, req.role)
        .await?
        .ok_or_else(member_not_found)?;

    tracing::info!(project_id = %project_id, user_id = %user_id, role = %membership.role, "Project member role updated");

    Ok(ApiResponse::ok(membership, "Project member role updated successfully"))
}

/// Removes a member
///
/// # Errors
///
/// - `404 Not Found`: The user is not a member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathIds((project_id, user_id)): PathIds<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Membership>> {
    require_project_role(&state.db, &auth, project_id, ADMINS).await?;

    let membership = Membership::delete(&state.db, project_id, user_id)
        .await?
        .ok_or_else(member_not_found)?;

    tracing::info!(project_id = %project_id, user_id = %user_id, "Project member removed");

    Ok(ApiResponse::ok(membership, "Project member deleted successfully"))
}
