pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Command, ServerArgs};

pub use config::local::LocalObjectStore;
pub use config::s3::S3ObjectStore;
pub use config::{ServerConfig, SyncConfig};
pub use core::{etl::EtlEngine, fetch::Fetcher, ingest::ConceptPipeline};
pub use utils::error::{ConceptsError, Result};
