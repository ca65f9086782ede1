//! Security configuration with multi-source merging.
//!
//! Settings merge in precedence order: built-in defaults, then the
//! project's `security.toml`, then `LYC_*` environment variables. The JWT
//! secret has no usable default; deployments must provide one.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lyceum_abac::{DecisionCache, Evaluator};

use crate::auth::{AuthService, JwtConfig};
use crate::pipeline::SecurityPipeline;

/// Default decision-cache TTL in seconds.
///
/// Short on purpose: a subject's KYC or role state can change between
/// requests, and the TTL bounds how long a stale decision can survive.
const DEFAULT_CACHE_TTL_SECS: u64 = 5;

/// Default decision-cache capacity.
const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// JWT settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    /// Shared HS256 signing secret.
    pub secret: String,
    /// Expected issuer claim.
    pub issuer: String,
    /// Accepted audience claims.
    pub audience: Vec<String>,
    /// Token lifetime in seconds (used when issuing).
    pub expiration_secs: u64,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "lyceum".to_string(),
            audience: vec!["lyceum".to_string()],
            expiration_secs: 3600,
        }
    }
}

/// Decision-cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// The full security configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub jwt: JwtSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl SecurityConfig {
    /// Builds the JWT configuration from these settings.
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(&self.jwt.secret)
            .with_issuer(&self.jwt.issuer)
            .with_audiences(self.jwt.audience.clone())
            .with_expiration(Duration::from_secs(self.jwt.expiration_secs))
    }

    /// Builds a decision cache from these settings.
    pub fn decision_cache(&self) -> DecisionCache {
        DecisionCache::new(
            Duration::from_secs(self.cache.ttl_secs),
            self.cache.capacity,
        )
    }

    /// Builds a pipeline over the given evaluator.
    pub fn build_pipeline(&self, evaluator: Arc<Evaluator>) -> SecurityPipeline {
        SecurityPipeline::new(
            AuthService::new(self.jwt_config()),
            evaluator,
            Arc::new(self.decision_cache()),
        )
    }
}

/// Configuration loader with builder pattern.
pub struct SecurityConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl SecurityConfigLoader {
    /// Creates a new loader with the current directory as project dir.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "LYC".to_string(),
        }
    }

    /// Sets the project directory.
    #[must_use]
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the environment variable prefix (default: "LYC").
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads configuration from all sources with proper precedence.
    pub fn load(self) -> Result<SecurityConfig> {
        let mut builder = config::Config::builder();

        // 1. Built-in defaults
        let defaults = SecurityConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Project config (security.toml)
        let config_file = self.project_dir.join("security.toml");
        if config_file.exists() {
            builder = builder.add_source(
                config::File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Environment variables (LYC_*)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let merged = builder
            .build()
            .context("Failed to build security configuration")?;

        merged
            .try_deserialize()
            .context("Failed to deserialize security configuration")
    }

    /// Loads configuration or returns defaults if loading fails.
    pub fn load_or_default(self) -> SecurityConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for SecurityConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("create temp dir");
        let config = SecurityConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .with_env_prefix("LYC_TEST_NONE")
            .load()
            .expect("load config");

        assert_eq!(config.jwt.issuer, "lyceum");
        assert_eq!(config.cache.ttl_secs, DEFAULT_CACHE_TTL_SECS);
        assert_eq!(config.cache.capacity, DEFAULT_CACHE_CAPACITY);
        assert!(config.jwt.secret.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = tempdir().expect("create temp dir");
        fs::write(
            temp_dir.path().join("security.toml"),
            r#"
[jwt]
secret = "from-file"
issuer = "lyceum-staging"

[cache]
ttl_secs = 2
"#,
        )
        .expect("write config file");

        let config = SecurityConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .with_env_prefix("LYC_TEST_FILE")
            .load()
            .expect("load config");

        assert_eq!(config.jwt.secret, "from-file");
        assert_eq!(config.jwt.issuer, "lyceum-staging");
        assert_eq!(config.cache.ttl_secs, 2);
        // Untouched values keep their defaults.
        assert_eq!(config.cache.capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.jwt.expiration_secs, 3600);
    }

    #[test]
    #[allow(unsafe_code)] // std::env::set_var is unsafe in edition 2024
    fn test_env_overrides_file() {
        let temp_dir = tempdir().expect("create temp dir");
        fs::write(
            temp_dir.path().join("security.toml"),
            "[jwt]\nissuer = \"from-file\"\n",
        )
        .expect("write config file");

        // Prefix is unique to this test to avoid cross-test interference.
        unsafe {
            env::set_var("LYCENVTEST_JWT_ISSUER", "from-env");
        }
        let config = SecurityConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .with_env_prefix("LYCENVTEST")
            .load()
            .expect("load config");
        unsafe {
            env::remove_var("LYCENVTEST_JWT_ISSUER");
        }

        assert_eq!(config.jwt.issuer, "from-env");
    }

    #[test]
    fn test_jwt_config_from_settings() {
        let mut settings = SecurityConfig::default();
        settings.jwt.secret = "s".to_string();
        settings.jwt.issuer = "custom".to_string();
        settings.jwt.audience = vec!["svc-a".to_string(), "svc-b".to_string()];
        settings.jwt.expiration_secs = 120;

        let jwt = settings.jwt_config();
        assert_eq!(jwt.issuer, "custom");
        assert_eq!(jwt.audience, vec!["svc-a", "svc-b"]);
        assert_eq!(jwt.expiration, Duration::from_secs(120));
    }
}
