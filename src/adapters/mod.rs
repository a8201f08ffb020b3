// Adapters layer: concrete implementations for external systems (downloads, spreadsheets).

pub mod export;
pub mod xlsx;
