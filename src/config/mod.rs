pub mod cli;
pub mod toml_config;

use crate::adapters::export::{file_stem, ExportFormat};
use crate::core::analysis::AnalysisKind;
use crate::core::upload::{UploadLimits, DEFAULT_MAX_KOS, DEFAULT_MAX_SAMPLES};
use crate::core::ConfigProvider;
use crate::utils::error::{BioremError, Result};
use crate::utils::validation::{
    validate_choices, validate_delimiter, validate_path, validate_positive_number, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "biorempp")]
#[command(about = "Bioremediation potential analysis of KO annotation files")]
pub struct CliConfig {
    /// KO annotation file ('>' sample headers followed by K##### lines)
    #[arg(short, long)]
    pub input: Option<String>,

    #[arg(long, default_value = "./data")]
    pub references_dir: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "csv")]
    pub formats: Vec<String>,

    /// Analyses to run (default: all except toxicity); use toxicity:<label column> for ToxCSM
    #[arg(long, value_delimiter = ',')]
    pub analyses: Vec<String>,

    #[arg(long, help = "Bundle all outputs into a single ZIP file")]
    pub bundle: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    pub max_samples: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_KOS)]
    pub max_kos: usize,

    #[arg(long, default_value = ";", help = "Delimiter of the reference database files")]
    pub delimiter: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log system resource usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit structured JSON logs")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let input = self
            .input
            .as_deref()
            .ok_or_else(|| BioremError::MissingConfigError {
                field: "--input".to_string(),
            })?;
        validate_path("input", input)?;
        validate_path("references_dir", &self.references_dir)?;
        validate_path("output_path", &self.output_path)?;
        validate_choices("formats", &self.formats, &ExportFormat::NAMES)?;
        validate_positive_number("max_samples", self.max_samples, 1)?;
        validate_positive_number("max_kos", self.max_kos, 1)?;
        validate_delimiter("delimiter", &self.delimiter)?;

        if self.formats.is_empty() {
            return Err(BioremError::InvalidConfigValueError {
                field: "formats".to_string(),
                value: String::new(),
                reason: "At least one output format is required".to_string(),
            });
        }

        for analysis in &self.analyses {
            analysis.parse::<AnalysisKind>()?;
        }
        validate_analysis_names("analyses", &parse_analyses(&self.analyses))?;

        Ok(())
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_file(&self) -> &str {
        self.input.as_deref().unwrap_or_default()
    }

    fn references_dir(&self) -> &str {
        &self.references_dir
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn reference_delimiter(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b';')
    }

    fn output_formats(&self) -> Vec<ExportFormat> {
        parse_formats(&self.formats)
    }

    fn analyses(&self) -> Vec<AnalysisKind> {
        parse_analyses(&self.analyses)
    }

    fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_samples: self.max_samples,
            max_kos: self.max_kos,
        }
    }

    fn bundle_outputs(&self) -> bool {
        self.bundle
    }
}

/// 格式去重並保留順序；無效值在驗證階段已被拒絕
pub(crate) fn parse_formats(values: &[String]) -> Vec<ExportFormat> {
    let mut formats = Vec::new();
    for format in values.iter().filter_map(|v| v.parse::<ExportFormat>().ok()) {
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    formats
}

/// 分析去重並保留順序；未指定時使用預設分析
pub(crate) fn parse_analyses(values: &[String]) -> Vec<AnalysisKind> {
    if values.is_empty() {
        return AnalysisKind::defaults();
    }
    let mut kinds = Vec::new();
    for kind in values.iter().filter_map(|v| v.parse::<AnalysisKind>().ok()) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

/// 不同分析的輸出檔名不可相同（例如 `toxicity:a b` 與 `toxicity:a_b`）
pub(crate) fn validate_analysis_names(field_name: &str, kinds: &[AnalysisKind]) -> Result<()> {
    let mut stems = HashSet::new();
    for kind in kinds {
        let stem = file_stem(&kind.table_name());
        if !stems.insert(stem.clone()) {
            return Err(BioremError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: kind.to_string(),
                reason: format!("Output name '{}' is already used by another analysis", stem),
            });
        }
    }
    Ok(())
}
