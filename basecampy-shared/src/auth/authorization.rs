/// Project-scoped authorization
///
/// Every project route names the exact set of roles it admits. There is no
/// role hierarchy: `admin` passes a check only when the set lists `admin`.
///
/// | set               | roles                          |
/// |-------------------|--------------------------------|
/// | [`ANY_ROLE`]      | admin, project_admin, member   |
/// | [`ADMINS`]        | admin                          |
/// | [`TASK_MANAGERS`] | admin, project_admin           |
///
/// The resolved role is returned to the handler instead of being stashed
/// anywhere.
///
/// # Example
///
/// ```no_run
/// use basecampy_shared::auth::authorization::{require_project_role, ADMINS};
/// use basecampy_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, auth: AuthContext, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let role = require_project_role(&pool, &auth, project_id, ADMINS).await?;
/// println!("acting as {}", role);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::membership::{Membership, ProjectRole};

/// Any member of the project
pub const ANY_ROLE: &[ProjectRole] = &[
    ProjectRole::Admin,
    ProjectRole::ProjectAdmin,
    ProjectRole::Member,
];

/// Project admins only
pub const ADMINS: &[ProjectRole] = &[ProjectRole::Admin];

/// Roles allowed to manage tasks and subtasks
pub const TASK_MANAGERS: &[ProjectRole] = &[ProjectRole::Admin, ProjectRole::ProjectAdmin];

/// Authorization failure
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User has no membership in the project
    #[error("You are not a member of this project")]
    NotMember(Uuid),

    /// User's role is outside the allowed set
    #[error("Role {actual} is not permitted to perform this action")]
    RoleNotAllowed {
        actual: ProjectRole,
        allowed: &'static [ProjectRole],
    },

    /// Membership lookup failed
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks a resolved role against an allowed set
///
/// # Example
///
/// ```
/// use basecampy_shared::auth::authorization::{check_role, TASK_MANAGERS};
/// use basecampy_shared::models::membership::ProjectRole;
///
/// assert!(check_role(ProjectRole::ProjectAdmin, TASK_MANAGERS).is_ok());
/// assert!(check_role(ProjectRole::Member, TASK_MANAGERS).is_err());
/// ```
pub fn check_role(
    role: ProjectRole,
    allowed: &'static [ProjectRole],
) -> Result<ProjectRole, AuthzError> {
    if allowed.contains(&role) {
        Ok(role)
    } else {
        Err(AuthzError::RoleNotAllowed {
            actual: role,
            allowed,
        })
    }
}

/// Requires the caller to hold one of the allowed roles in a project
///
/// # Returns
///
/// The caller's role in the project
///
/// # Errors
///
/// - `AuthzError::NotMember` if the caller has no membership
/// - `AuthzError::RoleNotAllowed` if the role is outside `allowed`
/// - `AuthzError::DatabaseError` if the lookup fails
pub async fn require_project_role(
    pool: &PgPool,
    auth: &AuthContext,
    project_id: Uuid,
    allowed: &'static [ProjectRole],
) -> Result<ProjectRole, AuthzError> {
    let role = Membership::get_role(pool, project_id, auth.user_id)
        .await?
        .ok_or(AuthzError::NotMember(project_id))?;

    let role = check_role(role, allowed)?;

    tracing::debug!(
        user_id = %auth.user_id,
        project_id = %project_id,
        role = %role,
        "Project access granted"
    );

    Ok(role)
}
