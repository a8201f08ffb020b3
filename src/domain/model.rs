use crate::utils::error::{BioremError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static KO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^K\d{5}$").expect("KO pattern is a valid regex"));

/// KEGG Orthology 識別碼 (`K` + 5 位數字)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ko(String);

impl Ko {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !KO_PATTERN.is_match(&value) {
            return Err(BioremError::InvalidKo { value });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ko {
    type Error = BioremError;

    fn try_from(value: String) -> Result<Self> {
        Ko::new(value)
    }
}

impl From<Ko> for String {
    fn from(ko: Ko) -> Self {
        ko.0
    }
}

impl fmt::Display for Ko {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SampleId(String);

impl SampleId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(BioremError::InvalidSampleId {
                value,
                reason: "sample name cannot be empty".to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SampleId {
    type Error = BioremError;

    fn try_from(value: String) -> Result<Self> {
        SampleId::new(value)
    }
}

impl From<SampleId> for String {
    fn from(id: SampleId) -> Self {
        id.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一個基因體/宏基因體樣本及其 KO 註解（保留原始順序與重複）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    id: SampleId,
    kos: Vec<Ko>,
}

impl Sample {
    pub fn new(id: SampleId, kos: Vec<Ko>) -> Self {
        Self { id, kos }
    }

    pub fn id(&self) -> &SampleId {
        &self.id
    }

    pub fn kos(&self) -> &[Ko] {
        &self.kos
    }

    pub fn ko_count(&self) -> usize {
        self.kos.len()
    }

    pub fn push_ko(&mut self, ko: Ko) {
        self.kos.push(ko);
    }

    /// 去重後的 KO，依首次出現順序
    pub fn unique_kos(&self) -> Vec<&Ko> {
        let mut seen = HashSet::new();
        self.kos.iter().filter(|ko| seen.insert(*ko)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn sample(&self, id: &str) -> Option<&Sample> {
        self.samples.iter().find(|s| s.id().as_str() == id)
    }

    pub fn total_kos(&self) -> usize {
        self.samples.iter().map(Sample::ko_count).sum()
    }

    pub fn unique_kos(&self) -> Vec<&Ko> {
        let mut seen = HashSet::new();
        self.samples
            .iter()
            .flat_map(|s| s.kos().iter())
            .filter(|ko| seen.insert(*ko))
            .collect()
    }
}

/// 四個參考資料庫
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Biorempp,
    Hadeg,
    Kegg,
    Toxcsm,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Biorempp,
        ReferenceKind::Hadeg,
        ReferenceKind::Kegg,
        ReferenceKind::Toxcsm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::Biorempp => "BioRemPP",
            ReferenceKind::Hadeg => "HADEG",
            ReferenceKind::Kegg => "KEGG",
            ReferenceKind::Toxcsm => "ToxCSM",
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            ReferenceKind::Biorempp => "database_biorempp.csv",
            ReferenceKind::Hadeg => "database_hadeg.csv",
            ReferenceKind::Kegg => "database_kegg.csv",
            ReferenceKind::Toxcsm => "database_toxcsm.csv",
        }
    }

    /// 與上傳資料（或 BioRemPP 合併結果）對接的欄位
    pub fn join_key(&self) -> &'static str {
        match self {
            ReferenceKind::Toxcsm => "cpd",
            _ => "ko",
        }
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            ReferenceKind::Biorempp => &[
                "ko",
                "cpd",
                "compoundname",
                "compoundclass",
                "referenceAG",
                "genesymbol",
            ],
            ReferenceKind::Hadeg => &["ko", "Gene", "Pathway", "compound_pathway"],
            ReferenceKind::Kegg => &["ko", "pathname", "genesymbol"],
            ReferenceKind::Toxcsm => &["cpd", "SMILES"],
        }
    }

    pub fn merged_table_name(&self) -> String {
        format!("{}_results", self.label().to_ascii_lowercase())
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_kind_keys() {
        assert_eq!(ReferenceKind::Toxcsm.join_key(), "cpd");
        assert_eq!(ReferenceKind::Hadeg.join_key(), "ko");
        assert_eq!(ReferenceKind::Kegg.merged_table_name(), "kegg_results");
        for kind in ReferenceKind::ALL {
            assert!(kind.required_columns().contains(&kind.join_key()));
        }
    }

    #[test]
    fn test_ko_accepts_valid_identifier() {
        let ko = Ko::new("K00001").unwrap();
        assert_eq!(ko.as_str(), "K00001");
        assert_eq!(ko.to_string(), "K00001");
    }

    #[test]
    fn test_ko_rejects_malformed_identifiers() {
        for bad in ["", "K0001", "K000001", "k00001", "X00001", "K0000A", " K00001"] {
            assert!(
                matches!(Ko::new(bad), Err(BioremError::InvalidKo { .. })),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_sample_id_rejects_blank() {
        assert!(SampleId::new("S1").is_ok());
        assert!(matches!(
            SampleId::new("   "),
            Err(BioremError::InvalidSampleId { .. })
        ));
    }

    #[test]
    fn test_sample_preserves_duplicates_and_order() {
        let kos = vec![
            Ko::new("K00002").unwrap(),
            Ko::new("K00001").unwrap(),
            Ko::new("K00002").unwrap(),
        ];
        let sample = Sample::new(SampleId::new("S1").unwrap(), kos);

        assert_eq!(sample.ko_count(), 3);
        assert_eq!(sample.kos()[0].as_str(), "K00002");
        let unique: Vec<&str> = sample.unique_kos().iter().map(|k| k.as_str()).collect();
        assert_eq!(unique, vec!["K00002", "K00001"]);
    }

    #[test]
    fn test_dataset_counts() {
        let dataset = Dataset::new(vec![
            Sample::new(
                SampleId::new("S1").unwrap(),
                vec![Ko::new("K00001").unwrap(), Ko::new("K00002").unwrap()],
            ),
            Sample::new(SampleId::new("S2").unwrap(), vec![Ko::new("K00001").unwrap()]),
        ]);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.total_kos(), 3);
        assert_eq!(dataset.unique_kos().len(), 2);
        assert!(dataset.sample("S2").is_some());
        assert!(dataset.sample("S3").is_none());
    }

    #[test]
    fn test_ko_deserialization_validates() {
        let ok: Ko = serde_json::from_str("\"K12345\"").unwrap();
        assert_eq!(ok.as_str(), "K12345");
        assert!(serde_json::from_str::<Ko>("\"K123\"").is_err());
    }
}
