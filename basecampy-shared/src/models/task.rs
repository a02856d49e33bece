/// Task model and database operations
///
/// Tasks belong to exactly one project. Every lookup takes the project ID
/// alongside the task ID, so a caller authorized for one project can never
/// reach a task of another.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     assigned_to UUID REFERENCES users(id),
///     assigned_by UUID NOT NULL REFERENCES users(id),
///     status task_status NOT NULL DEFAULT 'todo',
///     attachments JSONB NOT NULL DEFAULT '[]',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use basecampy_shared::models::task::{CreateTask, Task, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     project_id,
///     title: "Write docs".to_string(),
///     description: "Cover the API".to_string(),
///     assigned_to: None,
///     assigned_by: user_id,
///     status: TaskStatus::Todo,
///     attachments: Vec::new(),
/// }).await?;
///
/// let removed = Task::delete_with_subtasks(&pool, project_id, task.id).await?;
/// assert!(removed.is_some());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::subtask::{Subtask, SubtaskDetails};
use super::user::{User, UserSummary};

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started (default)
    #[default]
    Todo,

    /// Being worked on
    InProgress,

    /// Finished
    Done,
}

impl TaskStatus {
    /// Converts status to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

/// File attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub mimetype: String,
    pub size: i64,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Short title
    pub title: String,

    /// Longer description
    pub description: String,

    /// User the task is assigned to, if any
    pub assigned_to: Option<Uuid>,

    /// User who created the task
    pub assigned_by: Uuid,

    /// Current status
    pub status: TaskStatus,

    /// Attached files
    pub attachments: Json<Vec<Attachment>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Task with its assignee's public fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithAssignee {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: Option<UserSummary>,
}

/// Task with its assignee and its subtasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: Option<UserSummary>,
    pub subtasks: Vec<SubtaskDetails>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<Uuid>,
    pub assigned_by: Uuid,
    pub status: TaskStatus,
    pub attachments: Vec<Attachment>,
}

/// Partial task update (None leaves the field unchanged)
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<TaskStatus>,
    /// Replaces the whole attachment list when present
    pub attachments: Option<Vec<Attachment>>,
}

impl Task {
    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns an error if the project or a referenced user doesn't exist
    /// (foreign key violation) or the database connection fails
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, title, description, assigned_to, assigned_by, status, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, project_id, title, description, assigned_to, assigned_by,
                      status, attachments, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.assigned_to)
        .bind(data.assigned_by)
        .bind(data.status)
        .bind(Json(data.attachments))
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task inside a project
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, assigned_to, assigned_by,
                   status, attachments, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(task_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists the tasks of a project, oldest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, assigned_to, assigned_by,
                   status, attachments, created_at, updated_at
            FROM tasks
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Lists the tasks of a project with their assignees
    pub async fn list_with_assignees(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<TaskWithAssignee>, sqlx::Error> {
        let tasks = Self::list_by_project(pool, project_id).await?;

        let mut assignee_ids: Vec<Uuid> = tasks.iter().filter_map(|t| t.assigned_to).collect();
        assignee_ids.sort_unstable();
        assignee_ids.dedup();

        let users: HashMap<Uuid, UserSummary> = User::summaries_by_ids(pool, &assignee_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(tasks
            .into_iter()
            .map(|task| {
                let assignee = task.assigned_to.and_then(|id| users.get(&id).cloned());
                TaskWithAssignee { task, assignee }
            })
            .collect())
    }

    /// Loads a task with its assignee and subtasks
    ///
    /// # Returns
    ///
    /// None if the task doesn't exist in the project
    pub async fn details(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<TaskDetails>, sqlx::Error> {
        let Some(task) = Self::find_in_project(pool, project_id, task_id).await? else {
            return Ok(None);
        };

        let subtasks = Subtask::list_by_task(pool, task.id).await?;

        let mut user_ids: Vec<Uuid> = subtasks.iter().map(|s| s.created_by).collect();
        user_ids.extend(task.assigned_to);
        user_ids.sort_unstable();
        user_ids.dedup();

        let users: HashMap<Uuid, UserSummary> = User::summaries_by_ids(pool, &user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let assignee = task.assigned_to.and_then(|id| users.get(&id).cloned());
        let subtasks = subtasks
            .into_iter()
            .map(|subtask| {
                let creator = users.get(&subtask.created_by).cloned();
                SubtaskDetails { subtask, creator }
            })
            .collect();

        Ok(Some(TaskDetails {
            task,
            assignee,
            subtasks,
        }))
    }

    /// Applies a partial update to a task inside a project
    ///
    /// # Returns
    ///
    /// The updated task, or None if it doesn't exist in the project
    pub async fn update(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                assigned_to = COALESCE($5, assigned_to),
                status = COALESCE($6, status),
                attachments = COALESCE($7, attachments),
                updated_at = NOW()
            WHERE id = $1 AND project_id = $2
            RETURNING id, project_id, title, description, assigned_to, assigned_by,
                      status, attachments, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.assigned_to)
        .bind(data.status)
        .bind(data.attachments.map(Json))
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task and its subtasks in one transaction
    ///
    /// # Returns
    ///
    /// The deleted task and the number of subtasks removed with it, or None
    /// if the task doesn't exist in the project
    pub async fn delete_with_subtasks(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<(Self, u64)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE id = $1 AND project_id = $2 FOR UPDATE",
        )
        .bind(task_id)
        .bind(project_id)
        .fetch_optional(&mut *tx)
        .await?;

        if locked.is_none() {
            return Ok(None);
        }

        let subtasks = Subtask::delete_by_task_ids(&mut tx, &[task_id]).await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            DELETE FROM tasks
            WHERE id = $1
            RETURNING id, project_id, title, description, assigned_to, assigned_by,
                      status, attachments, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some((task, subtasks)))
    }

    /// Returns the IDs of every task in a project
    pub async fn ids_by_project(
        conn: &mut PgConnection,
        project_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(conn)
            .await?;

        Ok(ids)
    }

    /// Deletes a set of tasks by ID
    ///
    /// Their subtasks must already be gone.
    pub async fn delete_by_ids(conn: &mut PgConnection, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM tasks WHERE id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts tasks referencing a project
    pub async fn count_by_project(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
