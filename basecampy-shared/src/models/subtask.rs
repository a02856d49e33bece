/// Subtask model and database operations
///
/// Subtasks hang off a task. Lookups by subtask ID join through `tasks` so
/// they stay scoped to the project in the request path.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subtasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::user::UserSummary;

/// Subtask model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subtask with its creator's public fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskDetails {
    #[serde(flatten)]
    pub subtask: Subtask,
    pub creator: Option<UserSummary>,
}

/// Input for creating a subtask
#[derive(Debug, Clone)]
pub struct CreateSubtask {
    pub task_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_by: Uuid,
}

/// Partial subtask update (None leaves the field unchanged)
#[derive(Debug, Clone, Default)]
pub struct UpdateSubtask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
}

impl Subtask {
    /// Creates a subtask under a task
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if the task no longer exists
    pub async fn create(pool: &PgPool, data: CreateSubtask) -> Result<Self, sqlx::Error> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            INSERT INTO subtasks (task_id, title, description, is_completed, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, title, description, is_completed, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.is_completed)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(subtask)
    }

    /// Lists the subtasks of a task, oldest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let subtasks = sqlx::query_as::<_, Subtask>(
            r#"
            SELECT id, task_id, title, description, is_completed, created_by,
                   created_at, updated_at
            FROM subtasks
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(subtasks)
    }

    /// Finds a subtask whose task belongs to the given project
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        subtask_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            SELECT s.id, s.task_id, s.title, s.description, s.is_completed, s.created_by,
                   s.created_at, s.updated_at
            FROM subtasks s
            JOIN tasks t ON t.id = s.task_id
            WHERE s.id = $1 AND t.project_id = $2
            "#,
        )
        .bind(subtask_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(subtask)
    }

    /// Applies a partial update to a subtask inside a project
    ///
    /// # Returns
    ///
    /// The updated subtask, or None if it doesn't exist in the project
    pub async fn update(
        pool: &PgPool,
        project_id: Uuid,
        subtask_id: Uuid,
        data: UpdateSubtask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            UPDATE subtasks s
            SET title = COALESCE($3, s.title),
                description = COALESCE($4, s.description),
                is_completed = COALESCE($5, s.is_completed),
                updated_at = NOW()
            FROM tasks t
            WHERE s.id = $1 AND t.id = s.task_id AND t.project_id = $2
            RETURNING s.id, s.task_id, s.title, s.description, s.is_completed, s.created_by,
                      s.created_at, s.updated_at
            "#,
        )
        .bind(subtask_id)
        .bind(project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.is_completed)
        .fetch_optional(pool)
        .await?;

        Ok(subtask)
    }

    /// Deletes a subtask inside a project
    ///
    /// # Returns
    ///
    /// The deleted subtask, or None if it doesn't exist in the project
    pub async fn delete_in_project(
        pool: &PgPool,
        project_id: Uuid,
        subtask_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            DELETE FROM subtasks s
            USING tasks t
            WHERE s.id = $1 AND t.id = s.task_id AND t.project_id = $2
            RETURNING s.id, s.task_id, s.title, s.description, s.is_completed, s.created_by,
                      s.created_at, s.updated_at
            "#,
        )
        .bind(subtask_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(subtask)
    }

    /// Deletes every subtask of the given tasks
    ///
    /// # Returns
    ///
    /// Number of subtasks deleted
    pub async fn delete_by_task_ids(
        conn: &mut PgConnection,
        task_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM subtasks WHERE task_id = ANY($1)")
            .bind(task_ids)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts subtasks belonging to any of the given tasks
    pub async fn count_by_task_ids(pool: &PgPool, task_ids: &[Uuid]) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subtasks WHERE task_id = ANY($1)")
            .bind(task_ids)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
