// Configuration loading

pub mod columns;
pub mod error;
pub mod settings;

pub use columns::{load_columns, parse_columns_json, parse_columns_toml, ColumnSpec};
pub use error::ConfigError;
pub use settings::EngineSettings;
