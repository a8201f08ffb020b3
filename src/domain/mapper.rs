use crate::domain::model::{Dataset, Ko, Sample, SampleId};
use crate::domain::table::Table;
use crate::utils::error::Result;
use indexmap::IndexMap;

pub const SAMPLE_COLUMN: &str = "Sample";
pub const KO_COLUMN: &str = "KO";
pub const SAMPLE_TABLE_NAME: &str = "samples";

/// `Dataset` 與表格、字典兩種扁平表示之間的轉換
pub struct SampleMapper;

impl SampleMapper {
    /// 每個 (sample, KO) 配對一列，欄位固定為 `Sample`, `KO`
    pub fn to_table(dataset: &Dataset) -> Table {
        let rows = dataset.samples().iter().flat_map(|sample| {
            sample
                .kos()
                .iter()
                .map(move |ko| [sample.id().to_string(), ko.to_string()])
        });
        Table::from_fixed_rows(SAMPLE_TABLE_NAME, [SAMPLE_COLUMN, KO_COLUMN], rows)
    }

    pub fn from_table(table: &Table) -> Result<Dataset> {
        let sample_idx = table.require_column(SAMPLE_COLUMN)?;
        let ko_idx = table.require_column(KO_COLUMN)?;

        let mut groups: IndexMap<&str, Vec<Ko>> = IndexMap::new();
        for row in table.rows() {
            let ko = Ko::new(row[ko_idx].as_str())?;
            groups.entry(row[sample_idx].as_str()).or_default().push(ko);
        }

        let samples = groups
            .into_iter()
            .map(|(id, kos)| Ok(Sample::new(SampleId::new(id)?, kos)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Dataset::new(samples))
    }

    pub fn samples_to_map(dataset: &Dataset) -> IndexMap<String, Vec<String>> {
        dataset
            .samples()
            .iter()
            .map(|sample| {
                (
                    sample.id().to_string(),
                    sample.kos().iter().map(Ko::to_string).collect(),
                )
            })
            .collect()
    }

    pub fn map_to_dataset(map: &IndexMap<String, Vec<String>>) -> Result<Dataset> {
        let samples = map
            .iter()
            .map(|(id, kos)| {
                let kos = kos
                    .iter()
                    .map(|ko| Ko::new(ko.as_str()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Sample::new(SampleId::new(id.as_str())?, kos))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Dataset::new(samples))
    }
}
