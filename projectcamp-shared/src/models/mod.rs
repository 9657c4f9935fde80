/// Database models for Project Camp
///
/// Each model exposes its CRUD operations as associated async functions that
/// take a `PgPool` (or any executor where they run inside a transaction).
///
/// # Models
///
/// - `user`: accounts, credentials, session and one-time token state
/// - `project`: projects, the aggregate root for everything below
/// - `membership`: (project, user, role) triples
/// - `task`: tasks and their attachments
/// - `subtask`: checklist items under a task
/// - `note`: free-text project notes
///
/// # Example
///
/// ```no_run
/// use projectcamp_shared::models::user::{User, CreateUser};
/// use projectcamp_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     username: "user".to_string(),
///     full_name: None,
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod user;
pub mod project;
pub mod membership;
pub mod task;
pub mod subtask;
pub mod note;
