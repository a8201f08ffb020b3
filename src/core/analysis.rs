use crate::domain::mapper::{KO_COLUMN, SAMPLE_COLUMN};
use crate::domain::model::ReferenceKind;
use crate::domain::results::ProcessedResults;
use crate::domain::table::Table;
use crate::utils::error::{BioremError, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// 可選的使用案例分析
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    SampleSummary,
    CompoundsPerSample,
    CompoundClasses,
    RegulatoryAgencies,
    HadegPathways,
    KeggPathways,
    /// ToxCSM 的某個 `label_*` 欄位
    Toxicity(String),
}

impl AnalysisKind {
    pub fn defaults() -> Vec<AnalysisKind> {
        vec![
            AnalysisKind::SampleSummary,
            AnalysisKind::CompoundsPerSample,
            AnalysisKind::CompoundClasses,
            AnalysisKind::RegulatoryAgencies,
            AnalysisKind::HadegPathways,
            AnalysisKind::KeggPathways,
        ]
    }

    pub fn table_name(&self) -> String {
        match self {
            AnalysisKind::SampleSummary => "sample_summary".to_string(),
            AnalysisKind::CompoundsPerSample => "compounds_per_sample".to_string(),
            AnalysisKind::CompoundClasses => "compound_classes".to_string(),
            AnalysisKind::RegulatoryAgencies => "regulatory_agencies".to_string(),
            AnalysisKind::HadegPathways => "hadeg_pathways".to_string(),
            AnalysisKind::KeggPathways => "kegg_pathways".to_string(),
            AnalysisKind::Toxicity(label) => format!("toxicity_{}", label),
        }
    }

    pub fn run(&self, results: &ProcessedResults) -> Result<Table> {
        let mut table = match self {
            AnalysisKind::SampleSummary => sample_ko_summary(results)?,
            AnalysisKind::CompoundsPerSample => compounds_per_sample(results)?,
            AnalysisKind::CompoundClasses => compound_class_distribution(results)?,
            AnalysisKind::RegulatoryAgencies => regulatory_agency_counts(results)?,
            AnalysisKind::HadegPathways => hadeg_pathway_genes(results)?,
            AnalysisKind::KeggPathways => kegg_pathway_kos(results)?,
            AnalysisKind::Toxicity(label) => toxicity_profile(results, label)?,
        };
        table.set_name(self.table_name());
        Ok(table)
    }
}

impl FromStr for AnalysisKind {
    type Err = BioremError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if let Some(label) = value.strip_prefix("toxicity:") {
            return Ok(AnalysisKind::Toxicity(label.to_string()));
        }
        match value {
            "sample_summary" => Ok(AnalysisKind::SampleSummary),
            "compounds_per_sample" => Ok(AnalysisKind::CompoundsPerSample),
            "compound_classes" => Ok(AnalysisKind::CompoundClasses),
            "regulatory_agencies" => Ok(AnalysisKind::RegulatoryAgencies),
            "hadeg_pathways" => Ok(AnalysisKind::HadegPathways),
            "kegg_pathways" => Ok(AnalysisKind::KeggPathways),
            other => Err(BioremError::InvalidConfigValueError {
                field: "analyses".to_string(),
                value: other.to_string(),
                reason: "Unknown analysis. Valid values: sample_summary, compounds_per_sample, \
                         compound_classes, regulatory_agencies, hadeg_pathways, kegg_pathways, \
                         toxicity:<label column>"
                    .to_string(),
            }),
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::Toxicity(label) => write!(f, "toxicity:{}", label),
            other => f.write_str(&other.table_name()),
        }
    }
}

pub fn run_analyses(results: &ProcessedResults, kinds: &[AnalysisKind]) -> Result<Vec<Table>> {
    kinds
        .iter()
        .map(|kind| {
            let table = kind.run(results)?;
            tracing::debug!("Analysis '{}' produced {} rows", kind, table.len());
            Ok(table)
        })
        .collect()
}

fn merged<'a>(results: &'a ProcessedResults, kind: ReferenceKind) -> Result<&'a Table> {
    results
        .merged_table(kind)
        .ok_or_else(|| BioremError::ProcessingError {
            message: format!("{} merge result is not available", kind),
        })
}

/// 依 `group_by` 分組並計算 `distinct` 欄位的相異值數量（空值略過），保留首次出現順序
fn count_distinct(
    table: &Table,
    group_by: &[&str],
    distinct: &str,
    count_column: &str,
) -> Result<Table> {
    let group_idx = group_by
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<Vec<_>>>()?;
    let distinct_idx = table.require_column(distinct)?;

    let mut groups: IndexMap<Vec<&str>, HashSet<&str>> = IndexMap::new();
    for row in table.rows() {
        let value = row[distinct_idx].as_str();
        let key: Vec<&str> = group_idx.iter().map(|&i| row[i].as_str()).collect();
        if key.iter().skip(1).any(|k| k.is_empty()) {
            continue;
        }
        let entry = groups.entry(key).or_default();
        if !value.is_empty() {
            entry.insert(value);
        }
    }

    let mut columns: Vec<&str> = group_by.to_vec();
    columns.push(count_column);

    let mut output = Table::new(table.name(), columns);
    for (key, values) in groups {
        let mut row: Vec<String> = key.into_iter().map(str::to_string).collect();
        row.push(values.len().to_string());
        output.push_row(row)?;
    }
    Ok(output)
}

pub fn sample_ko_summary(results: &ProcessedResults) -> Result<Table> {
    let samples = &results.sample_table;
    let sample_idx = samples.require_column(SAMPLE_COLUMN)?;
    let ko_idx = samples.require_column(KO_COLUMN)?;

    let mut totals: IndexMap<&str, (usize, HashSet<&str>)> = IndexMap::new();
    for row in samples.rows() {
        let entry = totals.entry(row[sample_idx].as_str()).or_default();
        entry.0 += 1;
        entry.1.insert(row[ko_idx].as_str());
    }

    let biorempp = merged(results, ReferenceKind::Biorempp)?;
    let b_sample = biorempp.require_column(SAMPLE_COLUMN)?;
    let b_ko = biorempp.require_column(KO_COLUMN)?;
    let mut matched: IndexMap<&str, HashSet<&str>> = IndexMap::new();
    for row in biorempp.rows() {
        matched
            .entry(row[b_sample].as_str())
            .or_default()
            .insert(row[b_ko].as_str());
    }

    let mut output = Table::new(
        "sample_summary",
        vec![SAMPLE_COLUMN, "total_kos", "unique_kos", "biorempp_matched_kos"],
    );
    for (sample, (total, unique)) in totals {
        let hits = matched.get(sample).map(HashSet::len).unwrap_or(0);
        output.push_row(vec![
            sample.to_string(),
            total.to_string(),
            unique.len().to_string(),
            hits.to_string(),
        ])?;
    }
    Ok(output)
}

/// 每個樣本的相異化合物數，依數量遞減排序（同數量依樣本順序）
pub fn compounds_per_sample(results: &ProcessedResults) -> Result<Table> {
    let biorempp = merged(results, ReferenceKind::Biorempp)?;
    let counted = count_distinct(biorempp, &[SAMPLE_COLUMN], "cpd", "compound_count")?;

    let sample_idx = results.sample_table.require_column(SAMPLE_COLUMN)?;
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for row in results.sample_table.rows() {
        counts.entry(row[sample_idx].as_str()).or_insert(0);
    }
    for row in counted.rows() {
        let count = row[1].parse::<usize>().unwrap_or(0);
        counts.insert(row[0].as_str(), count);
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut output = Table::new("compounds_per_sample", vec![SAMPLE_COLUMN, "compound_count"]);
    for (sample, count) in ranked {
        output.push_row(vec![sample.to_string(), count.to_string()])?;
    }
    Ok(output)
}

pub fn compound_class_distribution(results: &ProcessedResults) -> Result<Table> {
    let biorempp = merged(results, ReferenceKind::Biorempp)?;
    count_distinct(
        biorempp,
        &[SAMPLE_COLUMN, "compoundclass"],
        "cpd",
        "compound_count",
    )
}

pub fn regulatory_agency_counts(results: &ProcessedResults) -> Result<Table> {
    let biorempp = merged(results, ReferenceKind::Biorempp)?;
    count_distinct(
        biorempp,
        &[SAMPLE_COLUMN, "referenceAG"],
        "cpd",
        "compound_count",
    )
}

pub fn hadeg_pathway_genes(results: &ProcessedResults) -> Result<Table> {
    let hadeg = merged(results, ReferenceKind::Hadeg)?;
    count_distinct(hadeg, &[SAMPLE_COLUMN, "Pathway"], "Gene", "gene_count")
}

pub fn kegg_pathway_kos(results: &ProcessedResults) -> Result<Table> {
    let kegg = merged(results, ReferenceKind::Kegg)?;
    count_distinct(kegg, &[SAMPLE_COLUMN, "pathname"], KO_COLUMN, "ko_count")
}

pub fn toxicity_profile(results: &ProcessedResults, label_column: &str) -> Result<Table> {
    let toxcsm = merged(results, ReferenceKind::Toxcsm)?;
    count_distinct(toxcsm, &[SAMPLE_COLUMN, label_column], "cpd", "compound_count")
}
