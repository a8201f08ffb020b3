use crate::domain::model::ReferenceKind;
use crate::domain::table::Table;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub input_rows: usize,
    pub output_rows: usize,
    pub matched_keys: usize,
    pub unmatched_keys: usize,
}

impl MergeStats {
    /// 有對應到參考資料的鍵值比例 (0.0 - 1.0)
    pub fn match_rate(&self) -> f64 {
        let total = self.matched_keys + self.unmatched_keys;
        if total == 0 {
            0.0
        } else {
            self.matched_keys as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub kind: ReferenceKind,
    pub table: Table,
    pub stats: MergeStats,
}

/// transform 階段的輸出
#[derive(Debug, Clone)]
pub struct ProcessedResults {
    pub sample_table: Table,
    pub merges: Vec<MergeOutcome>,
    pub analyses: Vec<Table>,
}

impl ProcessedResults {
    pub fn merge(&self, kind: ReferenceKind) -> Option<&MergeOutcome> {
        self.merges.iter().find(|m| m.kind == kind)
    }

    pub fn merged_table(&self, kind: ReferenceKind) -> Option<&Table> {
        self.merge(kind).map(|m| &m.table)
    }

    pub fn analysis(&self, name: &str) -> Option<&Table> {
        self.analyses.iter().find(|t| t.name() == name)
    }

    /// 所有要匯出的表格：合併結果在前，分析結果在後
    pub fn exportable_tables(&self) -> impl Iterator<Item = &Table> {
        self.merges.iter().map(|m| &m.table).chain(self.analyses.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub output_dir: String,
    pub written_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_rate() {
        let stats = MergeStats {
            input_rows: 4,
            output_rows: 6,
            matched_keys: 3,
            unmatched_keys: 1,
        };
        assert!((stats.match_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(MergeStats::default().match_rate(), 0.0);
    }
}
