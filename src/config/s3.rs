use crate::config::SyncConfig;
use crate::core::{ObjectEntry, ObjectStore};
use crate::utils::error::{ConceptsError, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;

/// Loads region and credential chain settings the way the AWS CLI does.
pub async fn load_sdk_config(config: &SyncConfig) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await
}

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    credentials: Option<SharedCredentialsProvider>,
}

impl S3ObjectStore {
    /// Builds the client from shared settings. A custom endpoint switches to
    /// path-style addressing for S3-compatible servers.
    pub fn from_sdk_config(
        sdk_config: &SdkConfig,
        bucket: String,
        endpoint_url: Option<&str>,
    ) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint_url {
            tracing::info!("Using custom S3 endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: S3Client::from_conf(builder.build()),
            bucket,
            credentials: sdk_config.credentials_provider(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolves credentials, then lists at most one key under `prefix`.
    pub async fn check_access(&self, prefix: &str) -> CredentialCheck {
        let Some(provider) = &self.credentials else {
            return CredentialCheck::NoCredentials;
        };

        if let Err(e) = provider.provide_credentials().await {
            tracing::debug!("Credential chain did not resolve: {}", e);
            return CredentialCheck::NoCredentials;
        }

        match self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
        {
            Ok(_) => CredentialCheck::Ok,
            Err(e) => CredentialCheck::Denied(DisplayErrorContext(&e).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    Ok,
    NoCredentials,
    Denied(String),
}

impl ObjectStore for S3ObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let mut entries = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut page_count = 0usize;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                ConceptsError::storage(format!(
                    "failed to list s3://{}/{}: {}",
                    self.bucket,
                    prefix,
                    DisplayErrorContext(&e)
                ))
            })?;
            page_count += 1;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    entries.push(ObjectEntry {
                        key: key.to_string(),
                        size: object.size().unwrap_or(0).max(0) as u64,
                    });
                }
            }
        }

        tracing::debug!(
            "Listed {} objects in {} pages from s3://{}/{}",
            entries.len(),
            page_count,
            self.bucket,
            prefix
        );
        Ok(entries)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                ConceptsError::storage(format!(
                    "failed to get s3://{}/{}: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let data = resp.body.collect().await.map_err(|e| {
            ConceptsError::storage(format!(
                "failed to read body of s3://{}/{}: {}",
                self.bucket, key, e
            ))
        })?;

        Ok(data.into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::retry::RetryConfig;
    use aws_credential_types::Credentials;

    // Nothing listens on port 1, so the listing fails fast without network.
    const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:1";

    fn sdk_config(credentials: Option<Credentials>) -> SdkConfig {
        let mut builder = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-1"))
            .retry_config(RetryConfig::disabled());
        builder.set_credentials_provider(credentials.map(SharedCredentialsProvider::new));
        builder.build()
    }

    fn store(sdk_config: &SdkConfig) -> S3ObjectStore {
        S3ObjectStore::from_sdk_config(
            sdk_config,
            "cpr-production-document-cache".to_string(),
            Some(UNREACHABLE_ENDPOINT),
        )
    }

    #[tokio::test]
    async fn test_static_credentials_are_detected() {
        let credentials = Credentials::new("AKIAFAKE", "fake", None, None, "test");
        let store = store(&sdk_config(Some(credentials)));

        let check = store.check_access("concepts").await;
        assert_ne!(check, CredentialCheck::NoCredentials);
        assert!(matches!(check, CredentialCheck::Denied(_)));
    }

    #[tokio::test]
    async fn test_missing_provider_reports_no_credentials() {
        let store = store(&sdk_config(None));
        assert_eq!(
            store.check_access("concepts").await,
            CredentialCheck::NoCredentials
        );
    }

    #[test]
    fn test_store_keeps_bucket_name() {
        let store = store(&sdk_config(None));
        assert_eq!(store.bucket(), "cpr-production-document-cache");
    }
}
