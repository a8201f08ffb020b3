use crate::adapters::export::{
    bundle_artifacts, ensure_unique_file_names, export_table, ExportArtifact,
};
use crate::core::analysis::run_analyses;
use crate::core::merge::DataProcessor;
use crate::core::progress::{ProcessingStage, ProgressTracker};
use crate::core::reference::ReferenceSet;
use crate::core::upload::UploadParser;
use crate::core::{ConfigProvider, Dataset, LoadReport, Pipeline, ProcessedResults, Storage};
use crate::utils::error::{BioremError, Result};
use std::sync::{Mutex, MutexGuard};

pub struct BioremPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    tracker: Mutex<ProgressTracker>,
}

impl<S: Storage, C: ConfigProvider> BioremPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self::with_tracker(storage, config, ProgressTracker::new())
    }

    pub fn with_tracker(storage: S, config: C, tracker: ProgressTracker) -> Self {
        Self {
            storage,
            config,
            tracker: Mutex::new(tracker),
        }
    }

    fn lock_tracker(&self) -> Result<MutexGuard<'_, ProgressTracker>> {
        self.tracker.lock().map_err(|_| BioremError::ProcessingError {
            message: "progress tracker lock poisoned".to_string(),
        })
    }

    fn advance(&self, stage: ProcessingStage) -> Result<()> {
        self.lock_tracker()?.advance(stage)
    }

    /// 每次 extract 都是新的一輪，重設進度
    fn start_run(&self) -> Result<()> {
        let mut tracker = self.lock_tracker()?;
        tracker.reset();
        tracker.advance(ProcessingStage::Validating)
    }

    /// 依設定的格式匯出所有表格
    pub fn export_all(&self, results: &ProcessedResults) -> Result<Vec<ExportArtifact>> {
        let formats = self.config.output_formats();
        let mut artifacts = Vec::new();

        for table in results.exportable_tables() {
            for format in &formats {
                artifacts.push(export_table(table, *format)?);
            }
        }

        ensure_unique_file_names(&artifacts)?;
        Ok(artifacts)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BioremPipeline<S, C> {
    async fn extract(&self) -> Result<Dataset> {
        self.start_run()?;
        let input = self.config.input_file();
        tracing::debug!("Reading upload from: {}", input);
        let bytes = self.storage.read_file(input).await?;

        if bytes.is_empty() {
            return Err(BioremError::Upload {
                line: 0,
                message: "uploaded file is empty".to_string(),
            });
        }

        self.advance(ProcessingStage::Parsing)?;
        let parsed = UploadParser::new(self.config.upload_limits()).parse_bytes(&bytes)?;
        Ok(parsed.dataset)
    }

    async fn transform(&self, data: Dataset) -> Result<ProcessedResults> {
        self.advance(ProcessingStage::LoadingReferences)?;
        let references = ReferenceSet::load_from_storage(
            &self.storage,
            self.config.references_dir(),
            self.config.reference_delimiter(),
        )
        .await?;

        let processor = DataProcessor::new(&references);
        let mut results = {
            let mut tracker = self.lock_tracker()?;
            processor.process(&data, &mut tracker)?
        };

        self.advance(ProcessingStage::Analysing)?;
        let kinds = self.config.analyses();
        results.analyses = run_analyses(&results, &kinds)?;

        Ok(results)
    }

    async fn load(&self, result: ProcessedResults) -> Result<LoadReport> {
        self.advance(ProcessingStage::Exporting)?;
        let mut artifacts = self.export_all(&result)?;

        if self.config.bundle_outputs() {
            tracing::debug!("Bundling {} files into a ZIP archive", artifacts.len());
            artifacts = vec![bundle_artifacts(&artifacts)?];
        }

        let mut report = LoadReport {
            output_dir: self.config.output_path().to_string(),
            written_files: Vec::with_capacity(artifacts.len()),
        };

        for artifact in &artifacts {
            self.storage
                .write_file(&artifact.file_name, &artifact.bytes)
                .await?;
            tracing::debug!(
                "Wrote {} ({}, {} bytes)",
                artifact.file_name,
                artifact.mime_type,
                artifact.bytes.len()
            );
            report.written_files.push(artifact.file_name.clone());
        }

        self.lock_tracker()?.finish()?;

        Ok(report)
    }
}
