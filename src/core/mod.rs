pub mod etl;
pub mod fetch;
pub mod ingest;

pub use crate::domain::model::{
    Concept, ConceptDetail, ConceptDocument, FetchReport, IngestPlan, IngestReport, ObjectEntry,
};
pub use crate::domain::ports::{ConfigProvider, ObjectStore, Pipeline};
pub use crate::utils::error::Result;
