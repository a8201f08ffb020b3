pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use adapters::export::ExportFormat;
pub use core::{etl::EtlEngine, pipeline::BioremPipeline};
pub use domain::mapper::SampleMapper;
pub use domain::model::{Dataset, Ko, ReferenceKind, Sample, SampleId};
pub use domain::table::Table;
pub use utils::error::{BioremError, Result};
