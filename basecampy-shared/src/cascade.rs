//! Project deletion across dependent tables
//!
//! Foreign keys from dependents to `projects` and `tasks` carry no
//! `ON DELETE CASCADE`. Deletion removes children explicitly, leaves first,
//! inside one transaction:
//!
//! 1. lock the project row
//! 2. memberships
//! 3. collect task IDs
//! 4. subtasks of those tasks
//! 5. the tasks
//! 6. notes
//! 7. the project itself
//!
//! Any failure rolls everything back. If a new dependent table is added and
//! not handled here, step 7 fails with a foreign key violation rather than
//! leaving orphans behind.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::Membership;
use crate::models::note::Note;
use crate::models::project::Project;
use crate::models::subtask::Subtask;
use crate::models::task::Task;

/// Rows removed by a project deletion, per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub memberships: u64,
    pub tasks: u64,
    pub subtasks: u64,
    pub notes: u64,
}

impl CascadeReport {
    /// Total dependent rows removed (the project row itself excluded)
    pub fn total(&self) -> u64 {
        self.memberships + self.tasks + self.subtasks + self.notes
    }
}

/// Deletes a project and everything that references it
///
/// # Returns
///
/// The deleted project and the per-table report, or None if the project
/// doesn't exist
///
/// # Errors
///
/// Returns an error if any statement fails; nothing is deleted in that case
pub async fn delete_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Option<(Project, CascadeReport)>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(project) = Project::find_for_update(&mut tx, project_id).await? else {
        return Ok(None);
    };

    let memberships = Membership::delete_by_project(&mut tx, project_id).await?;

    let task_ids = Task::ids_by_project(&mut tx, project_id).await?;
    let subtasks = Subtask::delete_by_task_ids(&mut tx, &task_ids).await?;
    let tasks = Task::delete_by_ids(&mut tx, &task_ids).await?;

    let notes = Note::delete_by_project(&mut tx, project_id).await?;

    Project::delete(&mut tx, project_id).await?;

    tx.commit().await?;

    let report = CascadeReport {
        memberships,
        tasks,
        subtasks,
        notes,
    };

    tracing::info!(
        project_id = %project_id,
        project_name = %project.name,
        memberships = report.memberships,
        tasks = report.tasks,
        subtasks = report.subtasks,
        notes = report.notes,
        "Project deleted with dependents"
    );

    Ok(Some((project, report)))
}
