use std::env;
use std::path::PathBuf;

use thiserror::Error;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub site: SiteConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub cloudinary: Option<CloudinaryConfig>,
    pub assistant: Option<AssistantConfig>,
}

/// Public identity of the site, used by feeds and SEO tags.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub url: String,
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_password_hash: String,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("admin_password_hash", &"<redacted>")
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub base_url: String,
}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: Option<String>,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub model: Option<String>,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let jwt_secret = require("JWT_SECRET")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
            });
        }

        let admin_password_hash = require("ADMIN_PASSWORD_HASH")?;
        if admin_password_hash.split('$').count() != 3 {
            return Err(ConfigError::Invalid {
                name: "ADMIN_PASSWORD_HASH",
                reason: "expected sha256$<salt>$<hex>".to_string(),
            });
        }

        let cookie_secure = match get("COOKIE_SECURE").as_deref() {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "COOKIE_SECURE",
                    reason: format!("expected true or false, got {}", other),
                })
            }
        };

        let cloudinary = match get("CLOUDINARY_CLOUD_NAME") {
            Some(cloud_name) => Some(CloudinaryConfig {
                cloud_name,
                api_key: require("CLOUDINARY_API_KEY")?,
                api_secret: require("CLOUDINARY_API_SECRET")?,
                folder: get("CLOUDINARY_FOLDER"),
            }),
            None => None,
        };

        let assistant = get("ANTHROPIC_API_KEY").map(|api_key| AssistantConfig {
            api_key,
            model: get("AI_MODEL"),
        });

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: require("DB_URL")?,
            site: SiteConfig {
                url: get("SITE_URL")
                    .unwrap_or_else(|| "http://localhost:3000".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                title: get("SITE_TITLE").unwrap_or_else(|| "folio".to_string()),
                description: get("SITE_DESCRIPTION").unwrap_or_default(),
            },
            auth: AuthConfig {
                jwt_secret,
                admin_password_hash,
                cookie_secure,
            },
            uploads: UploadConfig {
                dir: PathBuf::from(get("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string())),
                base_url: get("UPLOAD_BASE_URL")
                    .unwrap_or_else(|| "/uploads".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            cloudinary,
            assistant,
        })
    }
}
