use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::tier::TierTtls;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub elevation: ElevationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Bearer credential of the credential-prompt service; empty disables the callback
    #[serde(skip_serializing)]
    pub prompt_callback_secret: String,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationConfig {
    pub password_ttl_minutes: u64,
    pub elevated_ttl_minutes: u64,
    /// 0 leaves prompts open until answered
    pub prompt_timeout_secs: u64,
    /// Directory for per-session expiry documents; unset keeps elevation in memory
    pub store_dir: Option<PathBuf>,
    /// YAML route/role policy; unset uses the built-in console policy
    pub policy_file: Option<PathBuf>,
}

impl ElevationConfig {
    pub fn ttls(&self) -> TierTtls {
        TierTtls::from_minutes(self.password_ttl_minutes, self.elevated_ttl_minutes)
    }

    pub fn prompt_timeout(&self) -> Option<Duration> {
        match self.prompt_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
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

    fn with_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(v) = var("BRIGADE_API_PORT").or_else(|| var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Some(v) = var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Some(v) = var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = var("PROMPT_CALLBACK_SECRET") {
            self.security.prompt_callback_secret = v;
        }
        if let Some(v) = var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        // Elevation overrides
        if let Some(v) = var("ELEVATION_PASSWORD_TTL_MINUTES") {
            self.elevation.password_ttl_minutes = v.parse().unwrap_or(self.elevation.password_ttl_minutes);
        }
        if let Some(v) = var("ELEVATION_ELEVATED_TTL_MINUTES") {
            self.elevation.elevated_ttl_minutes = v.parse().unwrap_or(self.elevation.elevated_ttl_minutes);
        }
        if let Some(v) = var("ELEVATION_PROMPT_TIMEOUT_SECS") {
            self.elevation.prompt_timeout_secs = v.parse().unwrap_or(self.elevation.prompt_timeout_secs);
        }
        if let Some(v) = var("ELEVATION_STORE_DIR") {
            self.elevation.store_dir = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some(v) = var("ELEVATION_POLICY_FILE") {
            self.elevation.policy_file = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: "brigade-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                prompt_callback_secret: "brigade-dev-prompt-secret".to_string(),
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                enable_audit_logging: false,
            },
            elevation: ElevationConfig {
                password_ttl_minutes: 30,
                elevated_ttl_minutes: 15,
                prompt_timeout_secs: 0,
                store_dir: None,
                policy_file: None,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                prompt_callback_secret: String::new(),
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_audit_logging: true,
            },
            elevation: ElevationConfig {
                password_ttl_minutes: 30,
                elevated_ttl_minutes: 15,
                prompt_timeout_secs: 300,
                store_dir: Some(PathBuf::from("/var/lib/brigade/sessions")),
                policy_file: None,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                port: 8080,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                prompt_callback_secret: String::new(),
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_audit_logging: true,
            },
            elevation: ElevationConfig {
                password_ttl_minutes: 30,
                elevated_ttl_minutes: 15,
                prompt_timeout_secs: 300,
                store_dir: Some(PathBuf::from("/var/lib/brigade/sessions")),
                policy_file: None,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
