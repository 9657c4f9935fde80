/// One-time opaque tokens for email verification and password reset
///
/// The plaintext token is handed to the user exactly once (in a link); only
/// its SHA-256 hex digest is stored, together with an expiry. Lookups hash
/// the presented token and compare digests.
///
/// # Example
///
/// ```
/// use projectcamp_shared::auth::token::{generate_temporary_token, hash_token};
///
/// let token = generate_temporary_token();
/// assert_eq!(hash_token(&token.plaintext), token.hash);
/// assert!(token.expires_at > chrono::Utc::now());
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of a token
const TOKEN_LENGTH: usize = 40;

/// How long a verification or reset token stays valid
pub const TEMPORARY_TOKEN_TTL_MINUTES: i64 = 20;

/// Freshly generated token with its stored form
#[derive(Debug, Clone)]
pub struct TemporaryToken {
    /// Value sent to the user
    pub plaintext: String,

    /// SHA-256 hex digest persisted on the user row
    pub hash: String,

    /// Moment the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Generates a token valid for [`TEMPORARY_TOKEN_TTL_MINUTES`]
pub fn generate_temporary_token() -> TemporaryToken {
    let plaintext = generate_random_string(TOKEN_LENGTH);
    let hash = hash_token(&plaintext);

    TemporaryToken {
        plaintext,
        hash,
        expires_at: Utc::now() + Duration::minutes(TEMPORARY_TOKEN_TTL_MINUTES),
    }
}

fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a token (or refresh JWT) with SHA-256, hex encoded
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a presented token against a stored digest
pub fn verify_token(token: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_token(token), stored_hash)
}

/// Compares two strings without short-circuiting on the first mismatch
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Plausibility check applied before a database lookup
pub fn validate_token_format(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_temporary_token() {
        let token = generate_temporary_token();

        assert_eq!(token.plaintext.len(), TOKEN_LENGTH);
        assert_eq!(token.hash.len(), 64);
        assert!(validate_token_format(&token.plaintext));
        assert!(token.expires_at > Utc::now() + Duration::minutes(19));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_temporary_token();
        let b = generate_temporary_token();
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_token() {
        let token = generate_temporary_token();
        assert!(verify_token(&token.plaintext, &token.hash));
        assert!(!verify_token("something-else", &token.hash));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_validate_token_format() {
        assert!(!validate_token_format("short"));
        assert!(!validate_token_format(&"!".repeat(TOKEN_LENGTH)));
        assert!(validate_token_format(&"a".repeat(TOKEN_LENGTH)));
    }
}
