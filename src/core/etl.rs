use crate::core::{LoadReport, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::ResourceMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: ResourceMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: ResourceMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<LoadReport> {
        tracing::info!("🚀 Starting BioRemPP processing");

        // Extract
        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} samples ({} KO entries)",
            dataset.len(),
            dataset.total_kos()
        );
        self.monitor.log_snapshot("Extract");

        // Transform
        let results = self.pipeline.transform(dataset).await?;
        tracing::info!(
            "🔄 Produced {} merged tables and {} analyses",
            results.merges.len(),
            results.analyses.len()
        );
        self.monitor.log_snapshot("Transform");

        // Load
        let report = self.pipeline.load(results).await?;
        tracing::info!(
            "📁 Wrote {} files to {}",
            report.written_files.len(),
            report.output_dir
        );
        self.monitor.log_snapshot("Load");

        Ok(report)
    }
}
