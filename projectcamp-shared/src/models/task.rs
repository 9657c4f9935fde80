/// Task and attachment models and database operations
///
/// A task belongs to exactly one project. It may be assigned to a member of
/// that project and always records the user who created it (`assigned_by`).
/// Attachments live in their own table and keep insertion order through a
/// `BIGSERIAL` sequence column.
///
/// # Status
///
/// ```text
/// todo ⇄ in_progress ⇄ done
/// ```
///
/// Any status may be set from any other; there is no enforced workflow.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
///     assigned_by UUID NOT NULL REFERENCES users(id),
///     status task_status NOT NULL DEFAULT 'todo',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_attachments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     seq BIGSERIAL NOT NULL,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     url TEXT NOT NULL,
///     public_id VARCHAR(512),
///     resource_type VARCHAR(32) NOT NULL DEFAULT 'image',
///     original_name VARCHAR(512) NOT NULL,
///     mime_type VARCHAR(255) NOT NULL,
///     size BIGINT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use projectcamp_shared::models::task::{Task, CreateTask, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let (task, attachments) = Task::create(&pool, CreateTask {
///     project_id,
///     title: "Draft landing page".to_string(),
///     description: None,
///     assigned_to: None,
///     assigned_by: user_id,
///     status: TaskStatus::Todo,
/// }, Vec::new()).await?;
///
/// let details = Task::details(&pool, vec![task]).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::subtask::{Subtask, SubtaskView};
use super::user::UserSummary;

const TASK_COLUMNS: &str =
    "id, project_id, title, description, assigned_to, assigned_by, status, created_at, updated_at";

const ATTACHMENT_COLUMNS: &str =
    "id, task_id, url, public_id, resource_type, original_name, mime_type, size, created_at";

/// Task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,

    /// Assignee, always a member of the project at write time
    pub assigned_to: Option<Uuid>,

    /// Creator of the task
    pub assigned_by: Uuid,

    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File stored on the media host and attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub url: String,

    /// Media-host identifier; None for records created before it was stored
    pub public_id: Option<String>,

    /// Media-host resource type (`image`, `video`, `raw`)
    pub resource_type: String,

    pub original_name: String,
    pub mime_type: String,

    /// Size in bytes
    pub size: i64,

    pub created_at: DateTime<Utc>,
}

/// Attachment metadata returned by a media upload, ready to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub url: String,
    pub public_id: String,
    pub resource_type: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
}

/// Task with assignee, attachments and subtasks resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<UserSummary>,
    pub assigned_by: Uuid,
    pub attachments: Vec<Attachment>,
    pub subtasks: Vec<SubtaskView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task with its attachments, as returned by create and update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithAttachments {
    #[serde(flatten)]
    pub task: Task,
    pub attachments: Vec<Attachment>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub assigned_by: Uuid,
    pub status: TaskStatus,
}

/// Input for updating a task
///
/// All fields are optional. Only non-None fields will be updated; an absent
/// `assigned_to` keeps the current assignee.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    /// New assignee (use Some(None) to unassign)
    pub assigned_to: Option<Option<Uuid>>,
}

impl Task {
    /// Creates a task together with its attachment records
    ///
    /// Task and attachments are inserted in one transaction.
    pub async fn create(
        pool: &PgPool,
        data: CreateTask,
        attachments: Vec<NewAttachment>,
    ) -> Result<(Self, Vec<Attachment>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO tasks (project_id, title, description, assigned_to, assigned_by, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.project_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.assigned_to)
            .bind(data.assigned_by)
            .bind(data.status)
            .fetch_one(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            created.push(Attachment::create(&mut *tx, task.id, attachment).await?);
        }

        tx.commit().await?;

        Ok((task, created))
    }

    /// Finds a task that belongs to `project_id`
    ///
    /// Returns None both when the task doesn't exist and when it belongs to
    /// another project.
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND project_id = $2");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a project's tasks, newest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Updates task fields and optionally appends an attachment
    ///
    /// # Returns
    ///
    /// The updated task if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
        attachment: Option<NewAttachment>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }

        let Some(task) = q.fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };

        if let Some(attachment) = attachment {
            Attachment::create(&mut *tx, task.id, attachment).await?;
        }

        tx.commit().await?;

        Ok(Some(task))
    }

    /// Deletes a task; subtasks and attachment rows go with it
    ///
    /// # Returns
    ///
    /// The deleted task, or None if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("DELETE FROM tasks WHERE id = $1 RETURNING {TASK_COLUMNS}");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolves assignees, attachments and subtasks for a batch of tasks
    ///
    /// Issues a fixed number of queries regardless of the batch size and
    /// keeps the order of `tasks`.
    pub async fn details(pool: &PgPool, tasks: Vec<Task>) -> Result<Vec<TaskDetail>, sqlx::Error> {
        let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

        let attachments = Attachment::list_by_tasks(pool, &task_ids).await?;
        let subtasks = Subtask::list_by_tasks(pool, &task_ids).await?;

        let mut user_ids: Vec<Uuid> = tasks
            .iter()
            .filter_map(|t| t.assigned_to)
            .chain(subtasks.iter().map(|s| s.created_by))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = UserSummary::find_many(pool, &user_ids).await?;

        let mut attachments_by_task: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for attachment in attachments {
            attachments_by_task
                .entry(attachment.task_id)
                .or_default()
                .push(attachment);
        }

        let mut subtasks_by_task: HashMap<Uuid, Vec<SubtaskView>> = HashMap::new();
        for subtask in subtasks {
            let creator = users.get(&subtask.created_by).cloned();
            subtasks_by_task
                .entry(subtask.task_id)
                .or_default()
                .push(SubtaskView::new(subtask, creator));
        }

        Ok(tasks
            .into_iter()
            .map(|task| TaskDetail {
                assigned_to: task.assigned_to.and_then(|id| users.get(&id).cloned()),
                attachments: attachments_by_task.remove(&task.id).unwrap_or_default(),
                subtasks: subtasks_by_task.remove(&task.id).unwrap_or_default(),
                id: task.id,
                project_id: task.project_id,
                title: task.title,
                description: task.description,
                status: task.status,
                assigned_by: task.assigned_by,
                created_at: task.created_at,
                updated_at: task.updated_at,
            })
            .collect())
    }
}

impl Attachment {
    /// Inserts an attachment record for a task
    pub async fn create<'e, E>(
        executor: E,
        task_id: Uuid,
        data: NewAttachment,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO task_attachments
                (task_id, url, public_id, resource_type, original_name, mime_type, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Attachment>(&query)
            .bind(task_id)
            .bind(data.url)
            .bind(data.public_id)
            .bind(data.resource_type)
            .bind(data.original_name)
            .bind(data.mime_type)
            .bind(data.size)
            .fetch_one(executor)
            .await
    }

    /// Finds an attachment of a specific task
    pub async fn find_in_task(
        pool: &PgPool,
        task_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM task_attachments WHERE id = $1 AND task_id = $2"
        );

        sqlx::query_as::<_, Attachment>(&query)
            .bind(id)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists attachments of a task in insertion order
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        Self::list_by_tasks(pool, &[task_id]).await
    }

    /// Lists attachments of several tasks in insertion order
    pub async fn list_by_tasks(pool: &PgPool, task_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM task_attachments WHERE task_id = ANY($1) ORDER BY seq ASC"
        );

        sqlx::query_as::<_, Attachment>(&query)
            .bind(task_ids)
            .fetch_all(pool)
            .await
    }

    /// Deletes an attachment record
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_attachments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_serialization() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"done\"").unwrap(),
            TaskStatus::Done
        );
        assert!(serde_json::from_str::<TaskStatus>("\"blocked\"").is_err());
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskStatus::Todo.as_str(), "todo");
    }

    #[test]
    fn test_task_with_attachments_flattens() {
        let task = Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Ship".to_string(),
            description: None,
            assigned_to: None,
            assigned_by: Uuid::new_v4(),
            status: TaskStatus::Todo,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(TaskWithAttachments {
            task,
            attachments: Vec::new(),
        })
        .unwrap();

        assert_eq!(json["title"], "Ship");
        assert_eq!(json["status"], "todo");
        assert!(json["attachments"].as_array().unwrap().is_empty());
    }
}
