/// Project note model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     content TEXT NOT NULL,
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

/// Shortest accepted note content, in characters
pub const MIN_CONTENT_LEN: u64 = 5;

/// Longest accepted note content, in characters
pub const MAX_CONTENT_LEN: u64 = 500;

/// Note model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub project_id: Uuid,
    pub content: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note with its creator's public fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteWithCreator {
    #[serde(flatten)]
    pub note: Note,
    pub creator: UserSummary,
}

#[derive(sqlx::FromRow)]
struct NoteWithCreatorRow {
    id: Uuid,
    project_id: Uuid,
    content: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    username: String,
    full_name: Option<String>,
    avatar_url: String,
}

impl From<NoteWithCreatorRow> for NoteWithCreator {
    fn from(row: NoteWithCreatorRow) -> Self {
        NoteWithCreator {
            creator: UserSummary {
                id: row.created_by,
                username: row.username,
                full_name: row.full_name,
                avatar_url: row.avatar_url,
            },
            note: Note {
                id: row.id,
                project_id: row.project_id,
                content: row.content,
                created_by: row.created_by,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

impl Note {
    /// Creates a note in a project
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if the project no longer exists
    pub async fn create(
        pool: &PgPool,
        project_id: Uuid,
        created_by: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO project_notes (project_id, content, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, project_id, content, created_by, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(content)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(note)
    }

    /// Lists the notes of a project, newest first, with their creators
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<NoteWithCreator>, sqlx::Error> {
        let rows = sqlx::query_as::<_, NoteWithCreatorRow>(
            r#"
            SELECT n.id, n.project_id, n.content, n.created_by, n.created_at, n.updated_at,
                   u.username, u.full_name, u.avatar_url
            FROM project_notes n
            JOIN users u ON u.id = n.created_by
            WHERE n.project_id = $1
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(NoteWithCreator::from).collect())
    }

    /// Finds a note inside a project, with its creator
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
    ) -> Result<Option<NoteWithCreator>, sqlx::Error> {
        let row = sqlx::query_as::<_, NoteWithCreatorRow>(
            r#"
            SELECT n.id, n.project_id, n.content, n.created_by, n.created_at, n.updated_at,
                   u.username, u.full_name, u.avatar_url
            FROM project_notes n
            JOIN users u ON u.id = n.created_by
            WHERE n.id = $1 AND n.project_id = $2
            "#,
        )
        .bind(note_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(NoteWithCreator::from))
    }

    /// Replaces the content of a note inside a project
    ///
    /// # Returns
    ///
    /// The updated note, or None if it doesn't exist in the project
    pub async fn update(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE project_notes
            SET content = $3, updated_at = NOW()
            WHERE id = $1 AND project_id = $2
            RETURNING id, project_id, content, created_by, created_at, updated_at
            "#,
        )
        .bind(note_id)
        .bind(project_id)
        .bind(content)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Deletes a note inside a project
    pub async fn delete_in_project(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            DELETE FROM project_notes
            WHERE id = $1 AND project_id = $2
            RETURNING id, project_id, content, created_by, created_at, updated_at
            "#,
        )
        .bind(note_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Deletes every note of a project
    pub async fn delete_by_project(
        conn: &mut PgConnection,
        project_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_notes WHERE project_id = $1")
            .bind(project_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts notes referencing a project
    pub async fn count_by_project(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM project_notes WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
