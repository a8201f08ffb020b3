pub mod analysis;
pub mod etl;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod reference;
pub mod session;
pub mod upload;

pub use crate::domain::model::Dataset;
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::domain::results::{LoadReport, ProcessedResults};
pub use crate::utils::error::Result;
