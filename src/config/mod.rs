use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
    pub rls: RlsConfig,
    pub security: SecurityConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// The header value itself is the user id.
    Header,
    /// The header carries a signed access token, verified with the shared
    /// secret (HS*) or the project's JWK set.
    Jwt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub header_name: String,
    pub scheme: String,
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub project_url: Option<String>,
    /// Path of the JWK set relative to `project_url`.
    pub jwks_path: Option<String>,
    pub issuer: Option<String>,
    pub audience: Vec<String>,
    pub required_role: Option<String>,
    pub clock_tolerance_secs: u64,
    pub provision_accounts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlsConfig {
    pub header_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("AUTH_JWT_SECRET or AUTH_PROJECT_URL is required when AUTH_MODE=jwt")]
    MissingJwtKeys,
    #[error("Invalid project URL: {0}")]
    InvalidProjectUrl(String),
    #[error("Invalid JWKS path: {0}")]
    InvalidJwksPath(String),
    #[error("Default page limit must be positive")]
    InvalidDefaultLimit,
}

pub const DEFAULT_JWKS_PATH: &str = "/auth/v1/.well-known/jwks.json";

impl AuthConfig {
    fn project_url(&self) -> Option<&str> {
        self.project_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Where the project's signing keys are published, resolved against
    /// `project_url`. `None` when no project URL is configured.
    pub fn jwks_url(&self) -> Result<Option<url::Url>, ConfigError> {
        let Some(project_url) = self.project_url() else {
            return Ok(None);
        };
        let base = url::Url::parse(project_url)
            .map_err(|_| ConfigError::InvalidProjectUrl(project_url.to_string()))?;
        let path = self
            .jwks_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_JWKS_PATH);
        base.join(path)
            .map(Some)
            .map_err(|_| ConfigError::InvalidJwksPath(path.to_string()))
    }

    pub fn has_jwt_secret(&self) -> bool {
        self.jwt_secret.as_deref().map_or(false, |s| !s.is_empty())
    }

    /// Expected `iss` claim; explicit issuer wins over the project-derived one.
    pub fn issuer(&self) -> Option<String> {
        if let Some(issuer) = self.issuer.as_deref().filter(|i| !i.trim().is_empty()) {
            return Some(issuer.trim().to_string());
        }
        self.project_url()
            .map(|u| format!("{}/auth/v1", u.trim_end_matches('/')))
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(|key| env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.default_limit == 0 {
            return Err(ConfigError::InvalidDefaultLimit);
        }
        let jwks_url = self.auth.jwks_url()?;
        if self.auth.mode == AuthMode::Jwt && !self.auth.has_jwt_secret() && jwks_url.is_none() {
            return Err(ConfigError::MissingJwtKeys);
        }
        Ok(())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Database overrides
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging =
                v.parse().unwrap_or(self.database.enable_query_logging);
        }

        if let Some(v) = var("PAGINATION_DEFAULT_LIMIT") {
            self.pagination.default_limit = v.parse().unwrap_or(self.pagination.default_limit);
        }

        // Auth overrides
        if let Some(v) = var("AUTH_MODE") {
            match v.trim().to_ascii_lowercase().as_str() {
                "jwt" => self.auth.mode = AuthMode::Jwt,
                "header" => self.auth.mode = AuthMode::Header,
                _ => {}
            }
        }
        if let Some(v) = var("AUTH_HEADER_NAME") {
            self.auth.header_name = v.trim().to_ascii_lowercase();
        }
        if let Some(v) = var("AUTH_SCHEME") {
            self.auth.scheme = v.trim().to_string();
        }
        if let Some(v) = var("AUTH_JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        if let Some(v) = var("AUTH_PROJECT_URL") {
            self.auth.project_url = Some(v.trim().to_string());
        }
        if let Some(v) = var("AUTH_JWKS_PATH") {
            self.auth.jwks_path = Some(v.trim().to_string());
        }
        if let Some(v) = var("AUTH_ISSUER") {
            self.auth.issuer = Some(v.trim().to_string());
        }
        if let Some(v) = var("AUTH_AUDIENCE") {
            self.auth.audience = split_list(&v);
        }
        if let Some(v) = var("AUTH_REQUIRED_ROLE") {
            let role = v.trim();
            self.auth.required_role = (!role.is_empty()).then(|| role.to_string());
        }
        if let Some(v) = var("AUTH_CLOCK_TOLERANCE_SECS") {
            self.auth.clock_tolerance_secs = v.parse().unwrap_or(self.auth.clock_tolerance_secs);
        }
        if let Some(v) = var("AUTH_PROVISION_ACCOUNTS") {
            self.auth.provision_accounts = v.parse().unwrap_or(self.auth.provision_accounts);
        }

        if let Some(v) = var("RLS_HEADER_ROLE") {
            self.rls.header_role = v.trim().to_string();
        }

        // Security overrides
        if let Some(v) = var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        // Server overrides; the service-specific port wins over the generic one
        if let Some(v) = var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = var("LISTEE_API_PORT")
            .or_else(|| var("PORT"))
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            pagination: PaginationConfig { default_limit: 20 },
            auth: AuthConfig {
                mode: AuthMode::Header,
                header_name: "authorization".to_string(),
                scheme: "Bearer".to_string(),
                jwt_secret: None,
                project_url: None,
                jwks_path: None,
                issuer: None,
                audience: vec!["authenticated".to_string()],
                required_role: None,
                clock_tolerance_secs: 5,
                provision_accounts: true,
            },
            rls: RlsConfig {
                header_role: "authenticated".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.auth.mode = AuthMode::Jwt;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.server.host = "0.0.0.0".to_string();
        config
    }

    pub(crate) fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.enable_query_logging = false;
        config.auth.mode = AuthMode::Jwt;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config.server.host = "0.0.0.0".to_string();
        config
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
