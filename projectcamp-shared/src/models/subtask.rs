/// Subtask model and database operations
///
/// ```sql
/// CREATE TABLE subtasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
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

const SUBTASK_COLUMNS: &str = "id, task_id, title, is_completed, created_by, created_at, updated_at";

/// Checklist item under a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subtask with its creator's profile resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskView {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubtaskView {
    pub fn new(subtask: Subtask, created_by: Option<UserSummary>) -> Self {
        Self {
            id: subtask.id,
            task_id: subtask.task_id,
            title: subtask.title,
            is_completed: subtask.is_completed,
            created_by,
            created_at: subtask.created_at,
            updated_at: subtask.updated_at,
        }
    }
}

/// Input for creating a subtask
#[derive(Debug, Clone)]
pub struct CreateSubtask {
    pub task_id: Uuid,
    pub title: String,
    pub created_by: Uuid,
}

/// Input for updating a subtask
#[derive(Debug, Clone, Default)]
pub struct UpdateSubtask {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

impl Subtask {
    /// Creates a subtask under a task
    pub async fn create(pool: &PgPool, data: CreateSubtask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO subtasks (task_id, title, created_by) VALUES ($1, $2, $3) RETURNING {SUBTASK_COLUMNS}"
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(data.task_id)
            .bind(data.title)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a subtask whose task belongs to `project_id`
    ///
    /// Returns None both when the subtask doesn't exist and when it belongs
    /// to another project.
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"
            SELECT s.id, s.task_id, s.title, s.is_completed, s.created_by, s.created_at, s.updated_at
            FROM subtasks s
            JOIN tasks t ON t.id = s.task_id
            WHERE s.id = $1 AND t.project_id = $2
            "#,
        )
        .bind(id)
        .bind(project_id)
        .fetch_optional(pool)
        .await
    }

    /// Updates title and/or completion
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateSubtask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE subtasks
            SET title = COALESCE($2, title),
                is_completed = COALESCE($3, is_completed),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBTASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(id)
            .bind(data.title)
            .bind(data.is_completed)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a subtask, returning it if it existed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("DELETE FROM subtasks WHERE id = $1 RETURNING {SUBTASK_COLUMNS}");

        sqlx::query_as::<_, Subtask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the subtasks of several tasks, oldest first
    pub async fn list_by_tasks(pool: &PgPool, task_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE task_id = ANY($1) ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(task_ids)
            .fetch_all(pool)
            .await
    }

    /// Counts the subtasks of a task
    pub async fn count_by_task(pool: &PgPool, task_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM subtasks WHERE task_id = $1")
            .bind(task_id)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_view_serialization() {
        let subtask = Subtask {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            title: "Write copy".to_string(),
            is_completed: true,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(SubtaskView::new(subtask, None)).unwrap();
        assert_eq!(json["title"], "Write copy");
        assert_eq!(json["isCompleted"], true);
        assert!(json["createdBy"].is_null());
    }
}
