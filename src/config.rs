//! Runtime configuration
//!
//! Everything is read from the process environment after an optional `.env`
//! file has been merged in. Storage settings are required; capture settings
//! all have defaults.

use crate::utils::error::{AppError, AppResult};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ACL: &str = "public-read";
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 86_400;
pub const DEFAULT_FRAME_RATE: u32 = 30;

const REQUIRED_VARS: [&str; 4] = ["BUCKET_NAME", "ACCESS_KEY", "ACCESS_SECRET", "REGION"];

/// How the shareable URL is derived after a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPolicy {
    /// Pre-signed GET URL valid for `expiry`
    Presigned { expiry: Duration },
    /// Static URL built from a prefix that always ends in `/`
    Prefix(String),
    /// Whatever location the provider reports for the stored object
    Location,
}

impl UrlPolicy {
    /// Resolve the policy. Presigning wins over a prefix, which wins over
    /// the provider location.
    pub fn resolve(presign: bool, expiry_secs: u64, prefix: Option<&str>) -> Self {
        if presign {
            return UrlPolicy::Presigned {
                expiry: Duration::from_secs(expiry_secs),
            };
        }
        match prefix {
            Some(prefix) if !prefix.is_empty() => {
                if prefix.ends_with('/') {
                    UrlPolicy::Prefix(prefix.to_string())
                } else {
                    UrlPolicy::Prefix(format!("{}/", prefix))
                }
            }
            _ => UrlPolicy::Location,
        }
    }
}

/// Object storage settings
#[derive(Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub access_key: String,
    pub access_secret: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub acl: String,
    pub url_policy: UrlPolicy,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("acl", &self.acl)
            .field("url_policy", &self.url_policy)
            .finish()
    }
}

impl StorageConfig {
    /// Read storage settings from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read storage settings through an arbitrary lookup.
    ///
    /// Every missing required variable is reported in one error so the user
    /// can fix the environment in a single pass.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "{} not defined",
                missing.join(", ")
            )));
        }

        let presign = get("PRESIGN_URL")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let expiry_secs = get("PRESIGN_URL_EXPIRY")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS);
        let prefix = get("URL_PREFIX");

        Ok(Self {
            bucket: get("BUCKET_NAME").unwrap_or_default(),
            access_key: get("ACCESS_KEY").unwrap_or_default(),
            access_secret: get("ACCESS_SECRET").unwrap_or_default(),
            region: get("REGION").unwrap_or_default(),
            endpoint: get("ENDPOINT"),
            acl: get("ACL").unwrap_or_else(|| DEFAULT_ACL.to_string()),
            url_policy: UrlPolicy::resolve(presign, expiry_secs, prefix.as_deref()),
        })
    }
}

/// Capture pipeline settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub ffmpeg_path: String,
    pub frame_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

impl CaptureConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            ffmpeg_path: lookup("CLIPSHARE_FFMPEG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.ffmpeg_path),
            frame_rate: lookup("CLIPSHARE_FRAMERATE")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|fps| (1..=120).contains(fps))
                .unwrap_or(defaults.frame_rate),
        }
    }
}

/// Merge `.env` files into the process environment.
///
/// The working directory is tried first, then the directory holding the
/// executable. Variables already set in the environment are never
/// overwritten.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to parse .env: {}", e),
    }

    let exe_env = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")));
    if let Some(path) = exe_env {
        load_dotenv_file(&path);
    }
}

fn load_dotenv_file(path: &Path) {
    if !path.exists() {
        return;
    }
    match dotenvy::from_path(path) {
        Ok(()) => tracing::info!("Loaded environment from {:?}", path),
        Err(e) => tracing::warn!("Failed to parse {:?}: {}", path, e),
    }
}
