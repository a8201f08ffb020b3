use crate::domain::model::{Dataset, Ko, Sample, SampleId};
use crate::utils::error::{BioremError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_MAX_SAMPLES: usize = 100;
pub const DEFAULT_MAX_KOS: usize = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLimits {
    pub max_samples: usize,
    pub max_kos: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            max_kos: DEFAULT_MAX_KOS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    pub samples: usize,
    pub total_kos: usize,
    pub unique_kos: usize,
    pub encoding: TextEncoding,
}

#[derive(Debug, Clone)]
pub struct ParsedUpload {
    pub dataset: Dataset,
    pub stats: UploadStats,
}

/// 先嘗試 UTF-8，失敗則以 Latin-1 解碼（每個位元組對應一個字元）
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::Latin1,
        ),
    }
}

pub struct UploadParser {
    limits: UploadLimits,
}

impl UploadParser {
    pub fn new(limits: UploadLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedUpload> {
        let (text, encoding) = decode_text(bytes);
        tracing::debug!("Decoded upload ({} bytes) as {:?}", bytes.len(), encoding);

        let dataset = self.parse_str(&text)?;
        let stats = UploadStats {
            samples: dataset.len(),
            total_kos: dataset.total_kos(),
            unique_kos: dataset.unique_kos().len(),
            encoding,
        };

        tracing::info!(
            "📥 Parsed upload: {} samples, {} KO entries ({} unique)",
            stats.samples,
            stats.total_kos,
            stats.unique_kos
        );

        Ok(ParsedUpload { dataset, stats })
    }

    pub fn parse_str(&self, text: &str) -> Result<Dataset> {
        let mut dataset = Dataset::default();
        let mut seen_ids: HashSet<String> = HashSet::new();
        // 目前樣本與其標頭所在行號
        let mut current: Option<(Sample, usize)> = None;
        let mut total_kos = 0usize;

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();

            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix('>') {
                if let Some((sample, header_line)) = current.take() {
                    Self::finish_sample(&mut dataset, sample, header_line)?;
                }

                let id = Self::parse_header(name, line_no)?;
                if !seen_ids.insert(id.to_string()) {
                    return Err(BioremError::Upload {
                        line: line_no,
                        message: format!("duplicate sample name '{}'", id),
                    });
                }

                if seen_ids.len() > self.limits.max_samples {
                    return Err(BioremError::LimitExceeded {
                        what: "samples".to_string(),
                        limit: self.limits.max_samples,
                        actual: seen_ids.len(),
                    });
                }

                current = Some((Sample::new(id, Vec::new()), line_no));
                continue;
            }

            let Some((sample, _)) = current.as_mut() else {
                return Err(BioremError::Upload {
                    line: line_no,
                    message: "KO entry found before the first '>' sample header".to_string(),
                });
            };

            let ko = Ko::new(line).map_err(|_| BioremError::Upload {
                line: line_no,
                message: format!("'{}' is not a valid KO identifier (expected K#####)", line),
            })?;

            total_kos += 1;
            if total_kos > self.limits.max_kos {
                return Err(BioremError::LimitExceeded {
                    what: "KO entries".to_string(),
                    limit: self.limits.max_kos,
                    actual: total_kos,
                });
            }

            sample.push_ko(ko);
        }

        if let Some((sample, header_line)) = current.take() {
            Self::finish_sample(&mut dataset, sample, header_line)?;
        }

        if dataset.is_empty() {
            return Err(BioremError::Upload {
                line: 0,
                message: "no samples found; each sample must start with '>' followed by its name"
                    .to_string(),
            });
        }

        Ok(dataset)
    }

    fn parse_header(name: &str, line_no: usize) -> Result<SampleId> {
        if name.is_empty() {
            return Err(BioremError::Upload {
                line: line_no,
                message: "sample header has no name".to_string(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(BioremError::Upload {
                line: line_no,
                message: format!("sample name '{}' must not contain spaces", name),
            });
        }
        SampleId::new(name)
    }

    fn finish_sample(dataset: &mut Dataset, sample: Sample, header_line: usize) -> Result<()> {
        if sample.kos().is_empty() {
            return Err(BioremError::Upload {
                line: header_line,
                message: format!("sample '{}' has no KO entries", sample.id()),
            });
        }
        dataset.add_sample(sample);
        Ok(())
    }
}

impl Default for UploadParser {
    fn default() -> Self {
        Self::new(UploadLimits::default())
    }
}
