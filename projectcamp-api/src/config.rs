/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first when present).
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8000)
/// - `API_PRODUCTION`: enables HSTS and secure cookies (default: false)
/// - `CORS_ORIGINS`: comma-separated allowed origins, `*` for any (default: `*`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: session token signing key, at least 32 characters (required)
/// - `CLIENT_URL`: frontend base URL used in verification and reset links
///   (default: http://localhost:5173)
/// - `MAX_UPLOAD_BYTES`: per-file attachment limit (default: 10 MiB)
/// - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`:
///   media host credentials; uploads are refused when any is missing
/// - `CLOUDINARY_SIGNATURE_ALGORITHM`: `sha1` or `sha256`, matching the
///   account's signature setting (default: sha1)
/// - `CLOUDINARY_FOLDER`: folder for attachments (default: project-camp/attachments)
///
/// # Example
///
/// ```no_run
/// use projectcamp_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use projectcamp_shared::media::cloudinary::SignatureAlgorithm;
use std::env;

/// Default per-file upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum number of files accepted when creating a task
pub const MAX_ATTACHMENTS_PER_TASK: usize = 10;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub uploads: UploadConfig,

    /// None when media host credentials are absent
    pub media: Option<MediaConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode: HSTS header and `Secure` cookies
    pub production: bool,

    /// Allowed CORS origins (`*` = any)
    pub cors_origins: Vec<String>,

    /// Frontend base URL
    pub client_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Signing secret, at least 32 characters.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Attachment upload limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Per-file limit in bytes
    pub max_file_bytes: usize,

    /// Folder on the media host
    pub folder: String,
}

impl UploadConfig {
    /// Whole-request body limit: every file at its maximum plus form overhead
    pub fn max_body_bytes(&self) -> usize {
        self.max_file_bytes * MAX_ATTACHMENTS_PER_TASK + 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            folder: "project-camp/attachments".to_string(),
        }
    }
}

/// Media host credentials
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub signature_algorithm: SignatureAlgorithm,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot
    /// be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("API_PORT must be a port number")?;
        let production = env::var("API_PRODUCTION")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let client_url =
            env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let mut uploads = UploadConfig::default();
        if let Some(max) = optional_var("MAX_UPLOAD_BYTES") {
            uploads.max_file_bytes = max
                .parse()
                .context("MAX_UPLOAD_BYTES must be a number of bytes")?;
        }
        if let Some(folder) = optional_var("CLOUDINARY_FOLDER") {
            uploads.folder = folder;
        }

        let signature_algorithm = match optional_var("CLOUDINARY_SIGNATURE_ALGORITHM") {
            Some(value) => value
                .parse::<SignatureAlgorithm>()
                .map_err(|e| anyhow::anyhow!("CLOUDINARY_SIGNATURE_ALGORITHM: {}", e))?,
            None => SignatureAlgorithm::default(),
        };

        let media = match (
            optional_var("CLOUDINARY_CLOUD_NAME"),
            optional_var("CLOUDINARY_API_KEY"),
            optional_var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(MediaConfig {
                cloud_name,
                api_key,
                api_secret,
                signature_algorithm,
            }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
                client_url,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            uploads,
            media,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
