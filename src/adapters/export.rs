use crate::adapters::xlsx;
use crate::domain::table::Table;
use crate::utils::error::{BioremError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::{Cursor, Write};
use std::str::FromStr;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const BUNDLE_FILE_NAME: &str = "biorempp_results.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub const NAMES: [&'static str; 4] = ["csv", "json", "xlsx", "excel"];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = BioremError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(BioremError::InvalidConfigValueError {
                field: "formats".to_string(),
                value: other.to_string(),
                reason: format!("Unsupported format. Valid formats: {}", Self::NAMES.join(", ")),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 可下載的單一檔案
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "table".to_string()
    } else {
        stem
    }
}

pub fn export_table(table: &Table, format: ExportFormat) -> Result<ExportArtifact> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(table)?,
        ExportFormat::Json => to_json(table)?,
        ExportFormat::Xlsx => xlsx::write_workbook(table, table.name())?,
    };

    let artifact = ExportArtifact {
        file_name: format!("{}.{}", file_stem(table.name()), format.extension()),
        mime_type: format.mime_type(),
        bytes,
    };

    tracing::debug!(
        "Exported '{}' as {} ({} bytes)",
        table.name(),
        format,
        artifact.bytes.len()
    );
    Ok(artifact)
}

pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| BioremError::ExportError {
            message: format!("failed to flush CSV writer: {}", e),
        })
}

pub fn to_json(table: &Table) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&table.to_json_records())?)
}

/// 同名檔案會互相覆蓋，寫出前先拒絕
pub fn ensure_unique_file_names(artifacts: &[ExportArtifact]) -> Result<()> {
    let mut seen = HashSet::new();
    for artifact in artifacts {
        if !seen.insert(artifact.file_name.as_str()) {
            return Err(BioremError::ExportError {
                message: format!(
                    "two output tables map to the same file name '{}'",
                    artifact.file_name
                ),
            });
        }
    }
    Ok(())
}

/// 將多個檔案打包成單一 ZIP 下載
pub fn bundle_artifacts(artifacts: &[ExportArtifact]) -> Result<ExportArtifact> {
    ensure_unique_file_names(artifacts)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for artifact in artifacts {
        zip.start_file(artifact.file_name.as_str(), options)?;
        zip.write_all(&artifact.bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(ExportArtifact {
        file_name: BUNDLE_FILE_NAME.to_string(),
        mime_type: "application/zip",
        bytes: cursor.into_inner(),
    })
}
