#[cfg(feature = "cli")]
pub mod cli;
pub mod local;
pub mod s3;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::{ConceptsError, Result};
use crate::utils::validation::Validate;
use toml_config::TomlConfig;

pub const DEFAULT_BUCKET: &str = "cpr-production-document-cache";
pub const DEFAULT_PREFIX: &str = "concepts";
pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_DOWNLOAD_DIR: &str = "./s3-concepts";
pub const DEFAULT_DATABASE: &str = "concepts.db";
pub const DEFAULT_CONCURRENT_DOWNLOADS: usize = 8;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Values given explicitly on the command line. They win over the config
/// file, which wins over the environment, which wins over the defaults.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct ConfigOverrides {
    /// S3 bucket holding the concept documents
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub bucket: Option<String>,

    /// Key prefix of the concept documents
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub prefix: Option<String>,

    /// AWS region of the bucket
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub region: Option<String>,

    /// Local directory mirroring the bucket
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub download_dir: Option<String>,

    /// SQLite database file
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub database: Option<String>,

    /// Maximum parallel downloads
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub concurrent_downloads: Option<usize>,
}

/// Fully resolved settings for fetch and build.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub bucket: String,
    pub prefix: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub download_dir: String,
    pub database_path: String,
    pub concurrent_downloads: usize,
}

impl SyncConfig {
    pub fn resolve(overrides: &ConfigOverrides, file: Option<&TomlConfig>) -> Result<Self> {
        Self::resolve_with_env(overrides, file, |key| std::env::var(key).ok())
    }

    pub fn resolve_with_env(
        overrides: &ConfigOverrides,
        file: Option<&TomlConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let default_file = TomlConfig::default();
        let file = file.unwrap_or(&default_file);

        let config = Self {
            bucket: pick(
                &overrides.bucket,
                &file.source.bucket,
                env("S3_BUCKET"),
                DEFAULT_BUCKET,
            ),
            prefix: pick(
                &overrides.prefix,
                &file.source.prefix,
                env("S3_PREFIX"),
                DEFAULT_PREFIX,
            ),
            region: pick(
                &overrides.region,
                &file.source.region,
                env("AWS_REGION").or_else(|| env("AWS_DEFAULT_REGION")),
                DEFAULT_REGION,
            ),
            endpoint_url: file.source.endpoint_url.clone(),
            download_dir: pick(
                &overrides.download_dir,
                &file.paths.download_dir,
                env("CONCEPTS_DOWNLOAD_DIR"),
                DEFAULT_DOWNLOAD_DIR,
            ),
            database_path: pick(
                &overrides.database,
                &file.paths.database,
                env("CONCEPTS_DB"),
                DEFAULT_DATABASE,
            ),
            concurrent_downloads: overrides
                .concurrent_downloads
                .or(file.fetch.concurrent_downloads)
                .unwrap_or(DEFAULT_CONCURRENT_DOWNLOADS),
        };

        config.validate()?;
        Ok(config)
    }
}

fn pick(
    flag: &Option<String>,
    file: &Option<String>,
    env: Option<String>,
    default: &str,
) -> String {
    flag.clone()
        .or_else(|| file.clone())
        .or(env)
        .unwrap_or_else(|| default.to_string())
}

impl ConfigProvider for SyncConfig {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn download_dir(&self) -> &str {
        &self.download_dir
    }

    fn database_path(&self) -> &str {
        &self.database_path
    }

    fn concurrent_downloads(&self) -> usize {
        self.concurrent_downloads
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_s3_bucket_name("bucket", &self.bucket)?;
        validate_key_prefix("prefix", &self.prefix)?;
        validate_aws_region("region", &self.region)?;
        validate_path("download_dir", &self.download_dir)?;
        validate_path("database", &self.database_path)?;
        validate_range("concurrent_downloads", self.concurrent_downloads, 1, 64)?;
        Ok(())
    }
}

/// Fully resolved settings for the HTTP API.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub pool_size: u32,
}

impl ServerConfig {
    pub fn resolve(
        host: Option<String>,
        port: Option<u16>,
        database: Option<String>,
        file: Option<&TomlConfig>,
    ) -> Result<Self> {
        Self::resolve_with_env(host, port, database, file, |key| std::env::var(key).ok())
    }

    pub fn resolve_with_env(
        host: Option<String>,
        port: Option<u16>,
        database: Option<String>,
        file: Option<&TomlConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let default_file = TomlConfig::default();
        let file = file.unwrap_or(&default_file);

        let env_port = env("PORT").map(parse_port).transpose()?;

        let config = Self {
            host: pick(&host, &file.server.host, env("HOST"), DEFAULT_HOST),
            port: port
                .or(file.server.port)
                .or(env_port)
                .unwrap_or(DEFAULT_PORT),
            database_path: pick(
                &database,
                &file.paths.database,
                env("CONCEPTS_DB"),
                DEFAULT_DATABASE,
            ),
            pool_size: file.server.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: String) -> Result<u16> {
    match raw.parse::<u16>() {
        Ok(port) => Ok(port),
        Err(e) => Err(ConceptsError::InvalidConfigValueError {
            field: "PORT".to_string(),
            value: raw,
            reason: e.to_string(),
        }),
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_non_empty_string("host", &self.host)?;
        validate_path("database", &self.database_path)?;
        validate_range("pool_size", self.pool_size, 1, 64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            SyncConfig::resolve_with_env(&ConfigOverrides::default(), None, env_from(&[])).unwrap();
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.database_path, DEFAULT_DATABASE);
        assert_eq!(config.concurrent_downloads, DEFAULT_CONCURRENT_DOWNLOADS);
    }

    #[test]
    fn test_precedence_flag_file_env() {
        let file = TomlConfig::from_toml_str(
            "[source]\nbucket = \"file-bucket\"\nprefix = \"file-prefix\"\n",
        )
        .unwrap();
        let overrides = ConfigOverrides {
            bucket: Some("flag-bucket".to_string()),
            ..Default::default()
        };
        let env = env_from(&[
            ("S3_BUCKET", "env-bucket"),
            ("S3_PREFIX", "env-prefix"),
            ("CONCEPTS_DB", "/data/env.db"),
        ]);

        let config = SyncConfig::resolve_with_env(&overrides, Some(&file), env).unwrap();
        assert_eq!(config.bucket, "flag-bucket");
        assert_eq!(config.prefix, "file-prefix");
        assert_eq!(config.database_path, "/data/env.db");
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let overrides = ConfigOverrides {
            concurrent_downloads: Some(0),
            ..Default::default()
        };
        assert!(SyncConfig::resolve_with_env(&overrides, None, env_from(&[])).is_err());
    }

    #[test]
    fn test_server_config_resolution() {
        let env = env_from(&[("PORT", "9100"), ("CONCEPTS_DB", "/srv/concepts.db")]);
        let config = ServerConfig::resolve_with_env(None, None, None, None, env).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.database_path, "/srv/concepts.db");
        assert_eq!(config.bind_address(), "0.0.0.0:9100");

        let config =
            ServerConfig::resolve_with_env(None, Some(8081), None, None, env_from(&[])).unwrap();
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn test_server_config_rejects_bad_port_env() {
        let env = env_from(&[("PORT", "eighty")]);
        assert!(ServerConfig::resolve_with_env(None, None, None, None, env).is_err());
    }
}
