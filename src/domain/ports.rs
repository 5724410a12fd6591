use crate::domain::model::{ConceptDocument, IngestPlan, IngestReport, ObjectEntry};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::future::Future;

/// A bucket-like source of concept documents.
pub trait ObjectStore: Send + Sync {
    /// Lists every object under `prefix`, across all pages.
    fn list(&self, prefix: &str) -> impl Future<Output = Result<Vec<ObjectEntry>>> + Send;
    fn get(&self, key: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn bucket(&self) -> &str;
    fn prefix(&self) -> &str;
    fn download_dir(&self) -> &str;
    fn database_path(&self) -> &str;
    fn concurrent_downloads(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ConceptDocument>>;
    async fn transform(&self, documents: Vec<ConceptDocument>) -> Result<IngestPlan>;
    async fn load(&self, plan: IngestPlan) -> Result<IngestReport>;
}
