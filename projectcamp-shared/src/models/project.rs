/// Project model and database operations
///
/// A project is the aggregate root for memberships, tasks, subtasks and
/// notes. Deleting a project removes all of them through `ON DELETE CASCADE`
/// foreign keys.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use projectcamp_shared::models::project::{Project, CreateProject};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// // The creator becomes the project's first admin
/// let project = Project::create_with_admin(&pool, CreateProject {
///     name: "Website relaunch".to_string(),
///     description: Some("Q3 marketing site".to_string()),
///     created_by: user_id,
/// }).await?;
///
/// let mine = Project::list_for_user(&pool, user_id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::{CreateMembership, Membership, ProjectRole};

/// Project owned collectively by its members
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// User who created the project
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project row with its member count
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub member_count: i64,
}

/// A project as listed for one user, with that user's role
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithRole {
    pub project: ProjectSummary,
    pub role: ProjectRole,
}

#[derive(sqlx::FromRow)]
struct ProjectWithRoleRow {
    #[sqlx(flatten)]
    project: ProjectSummary,
    role: ProjectRole,
}

/// Input for creating a new project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Input for updating a project
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,
}

impl Project {
    /// Creates a project and makes its creator an admin
    ///
    /// Both rows are written in one transaction; a failure leaves neither.
    ///
    /// # Errors
    ///
    /// Returns an error if the creator doesn't exist or the database fails
    pub async fn create_with_admin(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.created_by)
        .fetch_one(&mut *tx)
        .await?;

        Membership::create(
            &mut *tx,
            CreateMembership {
                project_id: project.id,
                user_id: data.created_by,
                role: ProjectRole::Admin,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(project_id = %project.id, created_by = %project.created_by, "Project created");

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Updates a project's name and/or description
    ///
    /// # Returns
    ///
    /// The updated project if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, name, description, created_by, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Project>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a project and, by cascade, everything it owns
    ///
    /// Callers that keep media outside the database should collect
    /// [`Project::attachment_public_ids`] first.
    ///
    /// # Returns
    ///
    /// True if the project was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the projects a user belongs to, newest membership first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ProjectWithRoleRow>(
            r#"
            SELECT p.id, p.name, p.description, p.created_by, p.created_at,
                   (SELECT COUNT(*) FROM project_members c WHERE c.project_id = p.id) AS member_count,
                   pm.role
            FROM project_members pm
            JOIN projects p ON p.id = pm.project_id
            WHERE pm.user_id = $1
            ORDER BY pm.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProjectWithRole {
                project: row.project,
                role: row.role,
            })
            .collect())
    }

    /// Media-host identifiers of every attachment under the project
    pub async fn attachment_public_ids(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Vec<(String, String)>, sqlx::Error> {
        sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT a.public_id, a.resource_type
            FROM task_attachments a
            JOIN tasks t ON t.id = a.task_id
            WHERE t.project_id = $1 AND a.public_id IS NOT NULL
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }
}
