//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development. Without GitHub credentials uploads
//! go to a local directory served under `/files`.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use notehub_shared::constants::{DEFAULT_HTTP_PORT, MAX_UPLOAD_SIZE, QUOTA_COOLDOWN_SECS};

/// Credentials and target of the GitHub repository used as blob store.
#[derive(Clone)]
pub struct GitHubConfig {
    /// Env: `GITHUB_TOKEN`
    pub token: String,
    /// Env: `GITHUB_OWNER`
    pub owner: String,
    /// Env: `GITHUB_REPO`
    pub repo: String,
    /// Env: `GITHUB_BRANCH`
    /// Default: `main`
    pub branch: String,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .finish()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./notehub.db`
    pub database_path: PathBuf,

    /// GitHub blob store. `None` selects the local directory store.
    pub github: Option<GitHubConfig>,

    /// Directory used by the local blob store.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./blobs`
    pub blob_storage_path: PathBuf,

    /// URL prefix under which local blobs are reachable.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://localhost:5000/files`
    pub public_base_url: String,

    /// Upload ceiling in bytes. Can be lowered, never raised above 10 MiB.
    /// Env: `MAX_UPLOAD_SIZE`
    pub max_upload_size: usize,

    /// Cool-down after the blob store reports quota exhaustion.
    /// Env: `QUOTA_COOLDOWN_SECS`
    /// Default: one hour
    pub quota_cooldown: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./notehub.db"),
            github: None,
            blob_storage_path: PathBuf::from("./blobs"),
            public_base_url: format!("http://localhost:{DEFAULT_HTTP_PORT}/files"),
            max_upload_size: MAX_UPLOAD_SIZE,
            quota_cooldown: Duration::from_secs(QUOTA_COOLDOWN_SECS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        match (
            non_empty("GITHUB_TOKEN"),
            non_empty("GITHUB_OWNER"),
            non_empty("GITHUB_REPO"),
        ) {
            (Some(token), Some(owner), Some(repo)) => {
                config.github = Some(GitHubConfig {
                    token,
                    owner,
                    repo,
                    branch: non_empty("GITHUB_BRANCH").unwrap_or_else(|| "main".to_string()),
                });
            }
            (None, None, None) => {}
            _ => {
                tracing::warn!(
                    "GITHUB_TOKEN, GITHUB_OWNER and GITHUB_REPO must all be set; \
                     falling back to the local blob store"
                );
            }
        }

        if let Some(val) = lookup("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n.min(MAX_UPLOAD_SIZE),
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        if let Some(val) = lookup("QUOTA_COOLDOWN_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.quota_cooldown = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %val, "Invalid QUOTA_COOLDOWN_SECS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 5000).into());
        assert_eq!(config.max_upload_size, 10_485_760);
        assert_eq!(config.quota_cooldown, Duration::from_secs(3600));
        assert!(config.github.is_none());
    }

    #[test]
    fn test_github_requires_all_three() {
        let partial = from_pairs(&[("GITHUB_TOKEN", "t"), ("GITHUB_OWNER", "o")]);
        assert!(partial.github.is_none());

        let full = from_pairs(&[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_OWNER", "o"),
            ("GITHUB_REPO", "r"),
        ]);
        let gh = full.github.unwrap();
        assert_eq!(gh.branch, "main");
        assert_eq!(gh.repo, "r");
    }

    #[test]
    fn test_token_is_redacted() {
        let config = from_pairs(&[
            ("GITHUB_TOKEN", "ghp_secret"),
            ("GITHUB_OWNER", "o"),
            ("GITHUB_REPO", "r"),
        ]);
        assert!(!format!("{config:?}").contains("ghp_secret"));
    }

    #[test]
    fn test_upload_ceiling_cannot_be_raised() {
        let config = from_pairs(&[("MAX_UPLOAD_SIZE", "99999999999")]);
        assert_eq!(config.max_upload_size, MAX_UPLOAD_SIZE);

        let config = from_pairs(&[("MAX_UPLOAD_SIZE", "1024")]);
        assert_eq!(config.max_upload_size, 1024);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[("HTTP_ADDR", "nope"), ("QUOTA_COOLDOWN_SECS", "soon")]);
        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert_eq!(config.quota_cooldown, Duration::from_secs(3600));
    }
}
