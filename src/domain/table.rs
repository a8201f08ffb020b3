use crate::utils::error::{BioremError, Result};
use serde_json::{Map, Value};

/// 有序欄位的字串表格，作為合併與匯出的共同格式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: Vec<S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// 欄數由型別固定，列寬不需再檢查
    pub fn from_fixed_rows<const N: usize>(
        name: impl Into<String>,
        columns: [&str; N],
        rows: impl IntoIterator<Item = [String; N]>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows.into_iter().map(Vec::from).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// 取得欄位索引，缺少時回傳 `MissingColumn`
    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| BioremError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(BioremError::ProcessingError {
                message: format!(
                    "Row has {} cells but table '{}' has {} columns",
                    row.len(),
                    self.name,
                    self.columns.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|r| r[index].as_str())
    }

    /// 每列轉為依欄位順序排列的 JSON 物件
    pub fn to_json_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.clone(), Value::String(cell.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new("t", vec!["a", "b"]);
        assert!(table.push_row(vec!["1".into(), "2".into()]).is_ok());
        assert!(table.push_row(vec!["1".into()]).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_require_column_reports_table_name() {
        let table = Table::new("samples", vec!["Sample"]);
        match table.require_column("KO") {
            Err(BioremError::MissingColumn { table, column }) => {
                assert_eq!(table, "samples");
                assert_eq!(column, "KO");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_json_records_keep_column_order() {
        let mut table = Table::new("t", vec!["zeta", "alpha"]);
        table.push_row(vec!["1".into(), "2".into()]).unwrap();

        let json = serde_json::to_string(&table.to_json_records()).unwrap();
        assert_eq!(json, r#"[{"zeta":"1","alpha":"2"}]"#);
    }

    #[test]
    fn test_from_fixed_rows() {
        let table = Table::from_fixed_rows(
            "pairs",
            ["a", "b"],
            vec![["1".to_string(), "2".to_string()]],
        );
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.get(0, "b"), Some("2"));
        assert_eq!(table.len(), 1);
    }
}
