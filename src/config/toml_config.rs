use crate::utils::error::{ConceptsError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional configuration file. Every section and key may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub source: SourceSection,
    pub paths: PathsSection,
    pub fetch: FetchSection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSection {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
    /// S3-compatible endpoint, e.g. a local MinIO.
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    pub download_dir: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    pub concurrent_downloads: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub pool_size: Option<u32>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConceptsError::ConfigError {
            message: format!("cannot read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left
    /// untouched so validation can point at them.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            ConceptsError::ConfigError {
                message: format!("invalid substitution pattern: {}", e),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        if let Some(bucket) = &self.source.bucket {
            validate_s3_bucket_name("source.bucket", bucket)?;
        }
        if let Some(prefix) = &self.source.prefix {
            validate_key_prefix("source.prefix", prefix)?;
        }
        if let Some(region) = &self.source.region {
            validate_aws_region("source.region", region)?;
        }
        if let Some(dir) = &self.paths.download_dir {
            validate_path("paths.download_dir", dir)?;
        }
        if let Some(db) = &self.paths.database {
            validate_path("paths.database", db)?;
        }
        if let Some(concurrent) = self.fetch.concurrent_downloads {
            validate_range("fetch.concurrent_downloads", concurrent, 1, 64)?;
        }
        if let Some(size) = self.server.pool_size {
            validate_range("server.pool_size", size, 1, 64)?;
        }
        Ok(())
    }
}
