/// Project note model and database operations
///
/// ```sql
/// CREATE TABLE notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::user::UserSummary;

const NOTE_COLUMNS: &str = "id, project_id, content, created_by, created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub project_id: Uuid,
    pub content: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note with its author's profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub content: String,
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteView {
    pub fn new(note: Note, created_by: Option<UserSummary>) -> Self {
        Self {
            id: note.id,
            project_id: note.project_id,
            content: note.content,
            created_by,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

impl Note {
    /// Creates a note attributed to `created_by`
    pub async fn create(
        pool: &PgPool,
        project_id: Uuid,
        created_by: Uuid,
        content: String,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO notes (project_id, content, created_by) VALUES ($1, $2, $3) RETURNING {NOTE_COLUMNS}"
        );

        sqlx::query_as::<_, Note>(&query)
            .bind(project_id)
            .bind(content)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a note that belongs to `project_id`
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND project_id = $2");

        sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a project's notes, newest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE project_id = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, Note>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Replaces a note's content
    pub async fn update(pool: &PgPool, id: Uuid, content: String) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE notes SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING {NOTE_COLUMNS}"
        );

        sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .bind(content)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a note, returning it if it existed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("DELETE FROM notes WHERE id = $1 RETURNING {NOTE_COLUMNS}");

        sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolves authors for a batch of notes, keeping their order
    pub async fn with_authors(pool: &PgPool, notes: Vec<Note>) -> Result<Vec<NoteView>, sqlx::Error> {
        let mut author_ids: Vec<Uuid> = notes.iter().map(|n| n.created_by).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors = UserSummary::find_many(pool, &author_ids).await?;

        Ok(notes
            .into_iter()
            .map(|note| {
                let author = authors.get(&note.created_by).cloned();
                NoteView::new(note, author)
            })
            .collect())
    }
}
