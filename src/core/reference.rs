use crate::domain::model::ReferenceKind;
use crate::domain::ports::Storage;
use crate::domain::table::Table;
use crate::utils::error::{BioremError, Result};
use std::collections::HashMap;

pub const DEFAULT_DELIMITER: u8 = b';';

/// 已載入並建立鍵值索引的參考資料庫
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    kind: ReferenceKind,
    table: Table,
    key_index: usize,
    index: HashMap<String, Vec<usize>>,
}

impl ReferenceTable {
    pub fn load(kind: ReferenceKind, bytes: &[u8], delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = Table::new(kind.label(), headers);
        for required in kind.required_columns() {
            table.require_column(required)?;
        }

        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(str::to_string).collect())?;
        }

        Self::from_table(kind, table)
    }

    pub fn from_table(kind: ReferenceKind, table: Table) -> Result<Self> {
        let key_index = table.require_column(kind.join_key())?;

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, row) in table.rows().iter().enumerate() {
            let key = row[key_index].as_str();
            if key.is_empty() {
                continue;
            }
            index.entry(key.to_string()).or_default().push(position);
        }

        tracing::debug!(
            "Indexed {} reference: {} rows, {} distinct '{}' keys",
            kind,
            table.len(),
            index.len(),
            kind.join_key()
        );

        Ok(Self {
            kind,
            table,
            key_index,
            index,
        })
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.table.columns()[self.key_index]
    }

    pub fn key_index(&self) -> usize {
        self.key_index
    }

    /// 指定鍵值的所有資料列，依參考檔案中的順序
    pub fn lookup(&self, key: &str) -> impl Iterator<Item = &[String]> {
        self.index
            .get(key)
            .into_iter()
            .flatten()
            .map(|&position| self.table.rows()[position].as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn distinct_keys(&self) -> usize {
        self.index.len()
    }
}

/// 四個參考資料庫的集合
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    pub biorempp: ReferenceTable,
    pub hadeg: ReferenceTable,
    pub kegg: ReferenceTable,
    pub toxcsm: ReferenceTable,
}

impl ReferenceSet {
    pub async fn load_from_storage<S: Storage>(
        storage: &S,
        references_dir: &str,
        delimiter: u8,
    ) -> Result<Self> {
        let mut loaded = Vec::with_capacity(ReferenceKind::ALL.len());

        for kind in ReferenceKind::ALL {
            let path = if references_dir.is_empty() {
                kind.default_file_name().to_string()
            } else {
                format!(
                    "{}/{}",
                    references_dir.trim_end_matches('/'),
                    kind.default_file_name()
                )
            };

            tracing::debug!("Loading {} reference from {}", kind, path);
            let bytes = storage.read_file(&path).await?;
            let table = ReferenceTable::load(kind, &bytes, delimiter)?;
            tracing::info!("📚 Loaded {} reference ({} rows)", kind, table.table().len());
            loaded.push(table);
        }

        Self::from_tables(loaded)
    }

    pub fn from_tables(tables: Vec<ReferenceTable>) -> Result<Self> {
        let mut by_kind: HashMap<ReferenceKind, ReferenceTable> =
            tables.into_iter().map(|t| (t.kind(), t)).collect();

        let mut take = |kind: ReferenceKind| {
            by_kind
                .remove(&kind)
                .ok_or_else(|| BioremError::MissingConfigError {
                    field: format!("{} reference database", kind),
                })
        };

        Ok(Self {
            biorempp: take(ReferenceKind::Biorempp)?,
            hadeg: take(ReferenceKind::Hadeg)?,
            kegg: take(ReferenceKind::Kegg)?,
            toxcsm: take(ReferenceKind::Toxcsm)?,
        })
    }
}
