use crate::adapters::export::ExportFormat;
use crate::config::{parse_analyses, parse_formats, validate_analysis_names};
use crate::core::analysis::AnalysisKind;
use crate::core::reference::DEFAULT_DELIMITER;
use crate::core::upload::{UploadLimits, DEFAULT_MAX_KOS, DEFAULT_MAX_SAMPLES};
use crate::core::ConfigProvider;
use crate::utils::error::{BioremError, Result};
use crate::utils::validation::{
    validate_choices, validate_delimiter, validate_non_empty_string, validate_path,
    validate_positive_number, validate_required_field, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub references: ReferencesConfig,
    pub output: OutputConfig,
    pub analysis: Option<AnalysisConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub file: Option<String>,
    pub max_samples: Option<usize>,
    pub max_kos: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesConfig {
    pub dir: String,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
    pub bundle: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub enabled: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${BIOREMPP_DATA})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        let input = validate_required_field("input.file", &self.input.file)?;
        validate_path("input.file", input)?;
        validate_path("references.dir", &self.references.dir)?;
        validate_path("output.path", &self.output.path)?;

        if let Some(max) = self.input.max_samples {
            validate_positive_number("input.max_samples", max, 1)?;
        }
        if let Some(max) = self.input.max_kos {
            validate_positive_number("input.max_kos", max, 1)?;
        }
        if let Some(delimiter) = &self.references.delimiter {
            validate_delimiter("references.delimiter", delimiter)?;
        }

        if self.output.formats.is_empty() {
            return Err(BioremError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: String::new(),
                reason: "At least one output format is required".to_string(),
            });
        }
        validate_choices("output.formats", &self.output.formats, &ExportFormat::NAMES)?;

        for analysis in self.enabled_analyses() {
            validate_non_empty_string("analysis.enabled", analysis)?;
            analysis.parse::<AnalysisKind>()?;
        }
        validate_analysis_names("analysis.enabled", &parse_analyses(self.enabled_analyses()))?;

        if let Some(format) = self.monitoring.as_ref().and_then(|m| m.log_format.as_ref()) {
            validate_choices(
                "monitoring.log_format",
                std::slice::from_ref(format),
                &["compact", "json"],
            )?;
        }

        Ok(())
    }

    fn enabled_analyses(&self) -> &[String] {
        self.analysis
            .as_ref()
            .and_then(|a| a.enabled.as_deref())
            .unwrap_or(&[])
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_file(&self) -> &str {
        self.input.file.as_deref().unwrap_or_default()
    }

    fn references_dir(&self) -> &str {
        &self.references.dir
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn reference_delimiter(&self) -> u8 {
        self.references
            .delimiter
            .as_ref()
            .and_then(|d| d.as_bytes().first().copied())
            .unwrap_or(DEFAULT_DELIMITER)
    }

    fn output_formats(&self) -> Vec<ExportFormat> {
        parse_formats(&self.output.formats)
    }

    fn analyses(&self) -> Vec<AnalysisKind> {
        parse_analyses(self.enabled_analyses())
    }

    fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_samples: self.input.max_samples.unwrap_or(DEFAULT_MAX_SAMPLES),
            max_kos: self.input.max_kos.unwrap_or(DEFAULT_MAX_KOS),
        }
    }

    fn bundle_outputs(&self) -> bool {
        self.output.bundle.unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
