/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access/refresh session tokens
/// - [`token`]: one-time email verification and password reset tokens
/// - [`middleware`]: request auth context and session token extraction
/// - [`authorization`]: project role checks
///
/// # Example
///
/// ```no_run
/// use projectcamp_shared::auth::password::{hash_password, verify_password};
/// use projectcamp_shared::auth::jwt::issue_token_pair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password1")?;
/// assert!(verify_password("user_password1", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod token;
pub mod middleware;
pub mod authorization;
