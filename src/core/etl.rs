use crate::core::{IngestReport, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<IngestReport> {
        tracing::info!("Starting concept build...");
        self.monitor.log_stats("start");

        // Extract
        let documents = self.pipeline.extract().await?;
        tracing::info!("Extracted {} concept documents", documents.len());
        self.monitor.log_stats("extract");

        // Transform
        let plan = self.pipeline.transform(documents).await?;
        tracing::info!(
            "Planned {} concepts, {} subconcept and {} related relations",
            plan.concepts.len(),
            plan.subconcept_relations.len(),
            plan.related_relations.len()
        );
        self.monitor.log_stats("transform");

        // Load
        let report = self.pipeline.load(plan).await?;
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(report)
    }
}
