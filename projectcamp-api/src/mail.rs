//! Account mail
//!
//! No mail transport is configured; messages are written to the log with the
//! link the user would receive.

use projectcamp_shared::{auth::token::TEMPORARY_TOKEN_TTL_MINUTES, models::user::User};

use crate::config::ApiConfig;

fn link(config: &ApiConfig, path: &str, token: &str) -> String {
    format!("{}/{}/{}", config.client_url.trim_end_matches('/'), path, token)
}

pub fn send_email_verification(config: &ApiConfig, user: &User, token: &str) {
    tracing::info!(
        to = %user.email,
        username = %user.username,
        link = %link(config, "verify-email", token),
        expires_in_minutes = TEMPORARY_TOKEN_TTL_MINUTES,
        "Email verification mail"
    );
}

pub fn send_password_reset(config: &ApiConfig, user: &User, token: &str) {
    tracing::info!(
        to = %user.email,
        username = %user.username,
        link = %link(config, "reset-password", token),
        expires_in_minutes = TEMPORARY_TOKEN_TTL_MINUTES,
        "Password reset mail"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_trims_trailing_slash() {
        let config = ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            production: false,
            cors_origins: vec!["*".to_string()],
            client_url: "https://camp.example.com/".to_string(),
        };

        assert_eq!(
            link(&config, "verify-email", "abc"),
            "https://camp.example.com/verify-email/abc"
        );
    }
}
