/// Database models for Basecampy
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, credentials and one-shot tokens
/// - `project`: Projects owned by a creator
/// - `membership`: User-project relationships with roles
/// - `task`: Tasks scoped to a project
/// - `subtask`: Subtasks scoped to a task
/// - `note`: Free-text notes scoped to a project
///
/// # Example
///
/// ```no_run
/// use basecampy_shared::models::project::{CreateProject, Project};
/// use basecampy_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(creator: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project = Project::create(&pool, CreateProject {
///     name: "Alpha".to_string(),
///     description: None,
///     created_by: creator,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod membership;
pub mod note;
pub mod project;
pub mod subtask;
pub mod task;
pub mod user;
