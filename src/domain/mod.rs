// Domain layer: core models, tabular mapping and ports (interfaces).

pub mod mapper;
pub mod model;
pub mod ports;
pub mod results;
pub mod table;
