/// Project access control
///
/// Every project-scoped operation names the set of roles that may perform it.
/// The check resolves the caller's membership on the project and then tests
/// the membership's role against that set:
///
/// 1. **Membership**: no membership means [`AuthzError::NotAMember`], even
///    for reads.
/// 2. **Role set**: a non-empty set that does not contain the caller's role
///    means [`AuthzError::InsufficientRole`]. An empty set admits any member.
///
/// There is no ordering between roles; an `admin` is not implicitly a
/// `project admin`. The decision lives in [`authorize`], a pure function, so
/// it can be exercised without a database. [`require_project_role`] and
/// [`require_action`] wrap it with the membership lookup.
///
/// Deleting an attachment follows a separate rule, see
/// [`authorize_attachment_delete`].
///
/// # Example
///
/// ```no_run
/// use projectcamp_shared::auth::authorization::{require_action, ProjectAction};
/// use projectcamp_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, auth: AuthContext, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let membership = require_action(&pool, &auth, project_id, ProjectAction::DeleteTask).await?;
/// println!("Caller is {}", membership.role);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::membership::{Membership, ProjectRole};

/// Empty role set: any member may act
pub const ANY_MEMBER: &[ProjectRole] = &[];

/// Project administrators only
pub const ADMIN_ONLY: &[ProjectRole] = &[ProjectRole::Admin];

/// Admins and project admins
pub const TASK_MANAGERS: &[ProjectRole] = &[ProjectRole::Admin, ProjectRole::ProjectAdmin];

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller has no membership on the project
    #[error("You are not a member of project {0}")]
    NotAMember(Uuid),

    /// Caller's role is not in the action's role set
    #[error("Role {role} is not permitted to perform this action")]
    InsufficientRole {
        role: ProjectRole,
        allowed: Vec<ProjectRole>,
    },

    /// Caller is neither an administrator nor the task's assignor
    #[error("Only admins, project admins or the task assignor can delete attachments")]
    AttachmentDenied,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Project-scoped operations subject to access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectAction {
    ViewProject,
    UpdateProject,
    DeleteProject,
    ListMembers,
    AddMember,
    UpdateMemberRole,
    RemoveMember,
    ViewTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    CreateSubtask,
    UpdateSubtask,
    DeleteSubtask,
    ViewNotes,
    CreateNote,
    UpdateNote,
    DeleteNote,
}

impl ProjectAction {
    /// Roles permitted to perform this action
    pub fn allowed_roles(&self) -> &'static [ProjectRole] {
        use ProjectAction::*;

        match self {
            ViewProject | ListMembers | ViewTasks | UpdateSubtask | ViewNotes => ANY_MEMBER,
            UpdateProject | DeleteProject | AddMember | UpdateMemberRole | RemoveMember => {
                ADMIN_ONLY
            }
            CreateTask | UpdateTask | DeleteTask | CreateSubtask | DeleteSubtask => TASK_MANAGERS,
            CreateNote | UpdateNote | DeleteNote => ADMIN_ONLY,
        }
    }
}

/// Decides whether a resolved membership satisfies a role set
///
/// `membership` is the caller's membership on `project_id`, if any.
///
/// # Errors
///
/// - `AuthzError::NotAMember` when `membership` is `None`
/// - `AuthzError::InsufficientRole` when `allowed` is non-empty and does not
///   contain the membership's role
///
/// # Example
///
/// ```
/// use projectcamp_shared::auth::authorization::{authorize, ADMIN_ONLY, AuthzError};
/// use uuid::Uuid;
///
/// let result = authorize(None, Uuid::new_v4(), ADMIN_ONLY);
/// assert!(matches!(result, Err(AuthzError::NotAMember(_))));
/// ```
pub fn authorize(
    membership: Option<Membership>,
    project_id: Uuid,
    allowed: &[ProjectRole],
) -> Result<Membership, AuthzError> {
    let membership = membership.ok_or(AuthzError::NotAMember(project_id))?;

    if !allowed.is_empty() && !allowed.contains(&membership.role) {
        return Err(AuthzError::InsufficientRole {
            role: membership.role,
            allowed: allowed.to_vec(),
        });
    }

    Ok(membership)
}

/// Looks up the caller's membership and checks it against a role set
///
/// # Returns
///
/// The caller's membership, so handlers can use the resolved role
///
/// # Errors
///
/// Returns the errors of [`authorize`], or `AuthzError::DatabaseError` if the
/// lookup fails
pub async fn require_project_role(
    pool: &PgPool,
    auth: &AuthContext,
    project_id: Uuid,
    allowed: &[ProjectRole],
) -> Result<Membership, AuthzError> {
    let membership = Membership::find(pool, project_id, auth.user_id).await?;

    let result = authorize(membership, project_id, allowed);
    if let Err(ref e) = result {
        tracing::debug!(
            user_id = %auth.user_id,
            project_id = %project_id,
            error = %e,
            "Project access denied"
        );
    }

    result
}

/// Checks the caller may perform `action` on the project
pub async fn require_action(
    pool: &PgPool,
    auth: &AuthContext,
    project_id: Uuid,
    action: ProjectAction,
) -> Result<Membership, AuthzError> {
    require_project_role(pool, auth, project_id, action.allowed_roles()).await
}

/// Decides whether a member may delete an attachment of a task
///
/// Permitted for admins, project admins and the user who assigned the task.
/// Membership is still required.
pub fn authorize_attachment_delete(
    membership: Option<Membership>,
    project_id: Uuid,
    task_assigned_by: Uuid,
) -> Result<Membership, AuthzError> {
    let membership = authorize(membership, project_id, ANY_MEMBER)?;

    let is_manager = matches!(membership.role, ProjectRole::Admin | ProjectRole::ProjectAdmin);
    if is_manager || membership.user_id == task_assigned_by {
        Ok(membership)
    } else {
        Err(AuthzError::AttachmentDenied)
    }
}

/// Async wrapper of [`authorize_attachment_delete`] for the current caller
pub async fn require_attachment_delete(
    pool: &PgPool,
    auth: &AuthContext,
    project_id: Uuid,
    task_assigned_by: Uuid,
) -> Result<Membership, AuthzError> {
    let membership = Membership::find(pool, project_id, auth.user_id).await?;
    authorize_attachment_delete(membership, project_id, task_assigned_by)
}
