//! Core types shared by the BudgetGrid crates: row and cell identity, cell
//! values and column kinds, rectangular selections.

pub mod ids;
pub mod selection;
pub mod value;

pub use ids::{CellRef, FieldKey, GroupId, ModelId, PlaceholderId, RowId};
pub use selection::{CellRange, GridPos};
pub use value::{CellValue, ColumnKind, ColumnRole};
