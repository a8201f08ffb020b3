use crate::core::progress::{ProcessingStage, ProgressTracker};
use crate::core::reference::{ReferenceSet, ReferenceTable};
use crate::domain::mapper::{SampleMapper, KO_COLUMN};
use crate::domain::model::{Dataset, ReferenceKind};
use crate::domain::results::{MergeOutcome, MergeStats, ProcessedResults};
use crate::domain::table::Table;
use crate::utils::error::Result;
use std::collections::HashSet;

/// 以 `left_key` 欄位對參考資料做 inner join
///
/// 輸出欄位為左表全部欄位，接著是參考表除鍵值以外的欄位。
/// 欄名重複時保留左表的值。列順序依左表，每列展開為參考表中的全部對應列。
pub fn join_on(left: &Table, left_key: &str, reference: &ReferenceTable) -> Result<MergeOutcome> {
    let key_idx = left.require_column(left_key)?;
    let ref_key_idx = reference.key_index();

    let left_columns: HashSet<&str> = left.columns().iter().map(String::as_str).collect();
    let carried: Vec<usize> = reference
        .table()
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != ref_key_idx && !left_columns.contains(name.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut columns: Vec<String> = left.columns().to_vec();
    columns.extend(carried.iter().map(|&i| reference.table().columns()[i].clone()));

    let mut output = Table::new(reference.kind().merged_table_name(), columns);
    let mut matched: HashSet<&str> = HashSet::new();
    let mut unmatched: HashSet<&str> = HashSet::new();

    for row in left.rows() {
        let key = row[key_idx].as_str();
        let mut found = false;

        for ref_row in reference.lookup(key) {
            found = true;
            let mut merged = row.clone();
            merged.extend(carried.iter().map(|&i| ref_row[i].clone()));
            output.push_row(merged)?;
        }

        if found {
            matched.insert(key);
        } else {
            unmatched.insert(key);
        }
    }

    let stats = MergeStats {
        input_rows: left.len(),
        output_rows: output.len(),
        matched_keys: matched.len(),
        unmatched_keys: unmatched.len(),
    };

    Ok(MergeOutcome {
        kind: reference.kind(),
        table: output,
        stats,
    })
}

/// `[Sample, KO]` 表格與以 KO 為鍵的參考資料合併
pub fn merge_with_reference(sample_table: &Table, reference: &ReferenceTable) -> Result<MergeOutcome> {
    join_on(sample_table, KO_COLUMN, reference)
}

/// ToxCSM 透過 `cpd` 與 BioRemPP 合併結果對接
pub fn merge_with_toxcsm(biorempp_merged: &Table, toxcsm: &ReferenceTable) -> Result<MergeOutcome> {
    join_on(biorempp_merged, ReferenceKind::Toxcsm.join_key(), toxcsm)
}

pub struct DataProcessor<'a> {
    references: &'a ReferenceSet,
}

impl<'a> DataProcessor<'a> {
    pub fn new(references: &'a ReferenceSet) -> Self {
        Self { references }
    }

    /// 依序執行 BioRemPP → HADEG → KEGG → ToxCSM 合併
    pub fn process(&self, dataset: &Dataset, tracker: &mut ProgressTracker) -> Result<ProcessedResults> {
        let sample_table = SampleMapper::to_table(dataset);
        let mut merges = Vec::with_capacity(ReferenceKind::ALL.len());

        tracker.advance(ProcessingStage::MergingBiorempp)?;
        let biorempp = merge_with_reference(&sample_table, &self.references.biorempp)?;
        Self::log_outcome(&biorempp);

        tracker.advance(ProcessingStage::MergingHadeg)?;
        let hadeg = merge_with_reference(&sample_table, &self.references.hadeg)?;
        Self::log_outcome(&hadeg);

        tracker.advance(ProcessingStage::MergingKegg)?;
        let kegg = merge_with_reference(&sample_table, &self.references.kegg)?;
        Self::log_outcome(&kegg);

        tracker.advance(ProcessingStage::MergingToxcsm)?;
        let toxcsm = merge_with_toxcsm(&biorempp.table, &self.references.toxcsm)?;
        Self::log_outcome(&toxcsm);

        merges.push(biorempp);
        merges.push(hadeg);
        merges.push(kegg);
        merges.push(toxcsm);

        if merges.iter().all(|m| m.table.is_empty()) {
            tracing::warn!(
                "⚠️ None of the {} uploaded KOs matched any reference database",
                dataset.unique_kos().len()
            );
        }

        Ok(ProcessedResults {
            sample_table,
            merges,
            analyses: Vec::new(),
        })
    }

    fn log_outcome(outcome: &MergeOutcome) {
        tracing::info!(
            "🔗 {}: {} rows → {} rows ({} keys matched, {} unmatched, {:.1}%)",
            outcome.kind,
            outcome.stats.input_rows,
            outcome.stats.output_rows,
            outcome.stats.matched_keys,
            outcome.stats.unmatched_keys,
            outcome.stats.match_rate() * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Ko, Sample, SampleId};

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Sample::new(
                SampleId::new("S1").unwrap(),
                vec![Ko::new("K00001").unwrap(), Ko::new("K00002").unwrap()],
            ),
            Sample::new(
                SampleId::new("S2").unwrap(),
                vec![Ko::new("K00003").unwrap(), Ko::new("K00001").unwrap()],
            ),
        ])
    }

    fn biorempp() -> ReferenceTable {
        let data = "ko;genesymbol;genename;cpd;compoundclass;referenceAG;compoundname;enzyme_activity\n\
K00001;adh;alcohol dehydrogenase;C00001;Aliphatic;EPA;Ethanol;dehydrogenase\n\
K00001;adh;alcohol dehydrogenase;C00002;Aromatic;IARC;Phenol;dehydrogenase\n\
K00003;hom;homoserine dehydrogenase;C00003;Metal;EPA;Mercury;reductase\n";
        ReferenceTable::load(ReferenceKind::Biorempp, data.as_bytes(), b';').unwrap()
    }

    fn toxcsm() -> ReferenceTable {
        let data = "SMILES;cpd;ChEBI;compoundname;label_NR_AR;value_NR_AR\n\
CCO;C00001;16236;ethanol;Low Safety;0.71\n\
Oc1ccccc1;C00002;15882;phenol;High Safety;0.12\n";
        ReferenceTable::load(ReferenceKind::Toxcsm, data.as_bytes(), b';').unwrap()
    }

    #[test]
    fn test_inner_join_expands_and_drops() {
        let table = SampleMapper::to_table(&dataset());
        let outcome = merge_with_reference(&table, &biorempp()).unwrap();

        // S1/K00001 ×2, S2/K00003 ×1, S2/K00001 ×2；K00002 沒有對應
        assert_eq!(outcome.table.len(), 5);
        assert_eq!(outcome.stats.input_rows, 4);
        assert_eq!(outcome.stats.matched_keys, 2);
        assert_eq!(outcome.stats.unmatched_keys, 1);
        assert_eq!(
            outcome.table.columns()[..3],
            ["Sample".to_string(), "KO".to_string(), "genesymbol".to_string()]
        );
        assert!(!outcome.table.columns().contains(&"ko".to_string()));

        let order: Vec<(&str, &str)> = outcome
            .table
            .rows()
            .iter()
            .map(|r| (r[0].as_str(), r[5].as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("S1", "Aliphatic"),
                ("S1", "Aromatic"),
                ("S2", "Metal"),
                ("S2", "Aliphatic"),
                ("S2", "Aromatic"),
            ]
        );
    }

    #[test]
    fn test_toxcsm_joins_on_compound_and_keeps_left_on_collision() {
        let table = SampleMapper::to_table(&dataset());
        let merged = merge_with_reference(&table, &biorempp()).unwrap();
        let tox = merge_with_toxcsm(&merged.table, &toxcsm()).unwrap();

        // C00003 不在 ToxCSM 中
        assert_eq!(tox.table.len(), 4);
        let compound_cols = tox
            .table
            .columns()
            .iter()
            .filter(|c| c.as_str() == "compoundname")
            .count();
        assert_eq!(compound_cols, 1);
        assert_eq!(tox.table.get(0, "compoundname"), Some("Ethanol"));
        assert_eq!(tox.table.get(0, "label_NR_AR"), Some("Low Safety"));
        assert_eq!(tox.table.get(1, "SMILES"), Some("Oc1ccccc1"));
    }

    #[test]
    fn test_no_overlap_keeps_schema() {
        let only_unmatched = Dataset::new(vec![Sample::new(
            SampleId::new("S9").unwrap(),
            vec![Ko::new("K99999").unwrap()],
        )]);
        let table = SampleMapper::to_table(&only_unmatched);
        let outcome = merge_with_reference(&table, &biorempp()).unwrap();

        assert!(outcome.table.is_empty());
        assert_eq!(outcome.table.columns().len(), 2 + 7);
        assert_eq!(outcome.stats.unmatched_keys, 1);
    }
}
