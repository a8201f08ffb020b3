use crate::core::analysis::AnalysisKind;
use crate::core::upload::UploadLimits;
use crate::domain::model::Dataset;
use crate::domain::results::{LoadReport, ProcessedResults};
use crate::adapters::export::ExportFormat;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_file(&self) -> &str;
    fn references_dir(&self) -> &str;
    fn output_path(&self) -> &str;
    fn reference_delimiter(&self) -> u8;
    fn output_formats(&self) -> Vec<ExportFormat>;
    fn analyses(&self) -> Vec<AnalysisKind>;
    fn upload_limits(&self) -> UploadLimits;
    fn bundle_outputs(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<ProcessedResults>;
    async fn load(&self, result: ProcessedResults) -> Result<LoadReport>;
}
