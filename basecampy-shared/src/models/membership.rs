/// Membership model and database operations
///
/// A membership ties one user to one project with a role. The pair
/// (project_id, user_id) is the primary key, so a user holds at most one role
/// per project.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'project_admin', 'member');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **admin**: Manages the project, its members and its notes
/// - **project_admin**: Manages tasks and subtasks
/// - **member**: Reads the project and updates subtasks
///
/// Roles are not ordered. Every route names the exact set of roles it admits
/// (see [`crate::auth::authorization`]).
///
/// # Example
///
/// ```no_run
/// use basecampy_shared::models::membership::{Membership, ProjectRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// // Adding twice keeps one row with the latest role
/// Membership::upsert(&pool, project_id, user_id, ProjectRole::Member).await?;
/// Membership::upsert(&pool, project_id, user_id, ProjectRole::Admin).await?;
///
/// let role = Membership::get_role(&pool, project_id, user_id).await?;
/// assert_eq!(role, Some(ProjectRole::Admin));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::user::UserSummary;

/// Roles a user can hold inside a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// Full control over the project
    Admin,

    /// Manages tasks and subtasks
    ProjectAdmin,

    /// Regular collaborator
    Member,
}

impl ProjectRole {
    /// Every role, in declaration order
    pub const ALL: [ProjectRole; 3] = [
        ProjectRole::Admin,
        ProjectRole::ProjectAdmin,
        ProjectRole::Member,
    ];

    /// Converts role to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::ProjectAdmin => "project_admin",
            ProjectRole::Member => "member",
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown project role: {}", s))
    }
}

/// Membership model representing a user-project relationship with role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,

    /// When the role last changed
    pub updated_at: DateTime<Utc>,
}

/// A project member with the user's public fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub user: UserSummary,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProjectMemberRow {
    user_id: Uuid,
    username: String,
    full_name: Option<String>,
    avatar_url: String,
    role: ProjectRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectMemberRow> for ProjectMember {
    fn from(row: ProjectMemberRow) -> Self {
        ProjectMember {
            user: UserSummary {
                id: row.user_id,
                username: row.username,
                full_name: row.full_name,
                avatar_url: row.avatar_url,
            },
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Membership {
    /// Creates a new membership
    ///
    /// Takes a connection so project creation can add the creator inside its
    /// own transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Membership already exists (primary key violation)
    /// - Project or user doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(
        conn: &mut PgConnection,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(conn)
        .await?;

        Ok(membership)
    }

    /// Adds a user to a project, or overwrites the role of an existing member
    ///
    /// # Returns
    ///
    /// The membership as stored after the write
    ///
    /// # Errors
    ///
    /// Returns an error if the project or user doesn't exist (foreign key
    /// violation) or the database connection fails
    pub async fn upsert(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id)
            DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
            RETURNING project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a specific membership by project and user
    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT project_id, user_id, role, created_at, updated_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Gets a user's role in a project
    ///
    /// # Returns
    ///
    /// The user's role if they are a member, None otherwise
    pub async fn get_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, sqlx::Error> {
        let role: Option<ProjectRole> = sqlx::query_scalar(
            r#"
            SELECT role FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Updates a member's role
    ///
    /// # Returns
    ///
    /// The updated membership, or None if the user is not a member
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE project_members
            SET role = $3, updated_at = NOW()
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Removes a user from a project
    ///
    /// # Returns
    ///
    /// The removed membership, or None if the user was not a member
    pub async fn delete(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            DELETE FROM project_members
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Removes every membership of a project
    ///
    /// # Returns
    ///
    /// Number of memberships deleted
    pub async fn delete_by_project(
        conn: &mut PgConnection,
        project_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lists the members of a project with their public user fields
    pub async fn list_members(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMember>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ProjectMemberRow>(
            r#"
            SELECT pm.user_id, u.username, u.full_name, u.avatar_url,
                   pm.role, pm.created_at, pm.updated_at
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(ProjectMember::from).collect())
    }

    /// Counts memberships referencing a project
    pub async fn count_by_project(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(ProjectRole::Admin.as_str(), "admin");
        assert_eq!(ProjectRole::ProjectAdmin.as_str(), "project_admin");
        assert_eq!(ProjectRole::Member.as_str(), "member");

        assert_eq!(
            serde_json::to_string(&ProjectRole::ProjectAdmin).unwrap(),
            "\"project_admin\""
        );
    }

    #[test]
    fn test_role_from_str() {
        for role in ProjectRole::ALL {
            assert_eq!(role.as_str().parse::<ProjectRole>(), Ok(role));
        }
        assert!("owner".parse::<ProjectRole>().is_err());
        assert!("Admin".parse::<ProjectRole>().is_err());
    }

    #[test]
    fn test_unknown_role_rejected_by_serde() {
        let parsed: Result<ProjectRole, _> = serde_json::from_str("\"superuser\"");
        assert!(parsed.is_err());
    }
}
