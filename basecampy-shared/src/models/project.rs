/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL UNIQUE,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Creating a project also makes its creator an `admin` member, in the same
/// transaction. Deletion lives in [`crate::cascade`] because it has to clear
/// every dependent table first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::membership::{Membership, ProjectRole};

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project name, unique across all projects
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// User who created the project
    pub created_by: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Input for updating a project (None leaves the field unchanged)
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A project as seen by one of its members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectListing {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Number of members in the project
    pub members: i64,
    /// The caller's role in the project
    pub role: ProjectRole,
}

impl Project {
    /// Creates a project and registers its creator as `admin`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A project with the same name exists (`projects_name_key` violation)
    /// - The creator doesn't exist (foreign key violation)
    /// - Database connection fails
    ///
    /// Nothing is written when any step fails.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(data.name.trim())
        .bind(data.description)
        .bind(data.created_by)
        .fetch_one(&mut *tx)
        .await?;

        Membership::create(&mut tx, project.id, data.created_by, ProjectRole::Admin).await?;

        tx.commit().await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Finds a project by ID and locks its row until the transaction ends
    ///
    /// Inserts that reference the project wait on this lock, so nothing new
    /// can attach to a project while it is being deleted.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(project)
    }

    /// Updates name and/or description
    ///
    /// # Returns
    ///
    /// The updated project if found, None otherwise
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Deletes the project row itself
    ///
    /// Fails with a foreign key violation while any dependent row remains.
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the projects a user belongs to, with their role and member count
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectListing>, sqlx::Error> {
        let projects = sqlx::query_as::<_, ProjectListing>(
            r#"
            SELECT p.id, p.name, p.description, p.created_by, p.created_at,
                   (SELECT COUNT(*) FROM project_members m WHERE m.project_id = p.id) AS members,
                   pm.role
            FROM project_members pm
            JOIN projects p ON p.id = pm.project_id
            WHERE pm.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }
}
