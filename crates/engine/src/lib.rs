//! Tabular editing engine for budget tables.
//!
//! A [`Table`] is an immutable snapshot of rows, groups and a footer. Every
//! mutation is a [`ChangeEvent`] applied with [`Table::apply`], which returns a
//! new snapshot plus an [`ApplyOutcome`] describing what changed. Clipboard and
//! navigation helpers produce change events rather than mutating anything, and
//! [`TableSession`] ties them together with undo history and event callbacks.

pub mod aggregate;
pub mod change;
pub mod clipboard;
pub mod column;
pub mod diagnostics;
pub mod entity;
pub mod events;
pub mod lookup;
pub mod navigation;
pub mod row;
pub mod session;
pub mod table;

pub use aggregate::sum_rows;
pub use change::{CellChange, ChangeEvent, FieldValue, NewRow};
pub use clipboard::{
    cells_in_range, clear_cells, clear_range, decode_cell, encode_cell, from_clipboard_text, to_clipboard_text,
    ClipboardExport, ClipboardState, CutOutcome, PasteOutcome, StagedCut,
};
pub use column::{is_editable, set_value, Column, Columns, DecodeError, Editable, EncodeError, SetError};
pub use diagnostics::{Diagnostic, Severity};
pub use entity::{Account, Actual, Contact, Fringe, SubAccount, TableEntity};
pub use events::{EventCallback, EventCollector, TableEvent};
pub use lookup::Lookup;
pub use navigation::{first_cell, next_cell, NavKey, NavOutcome};
pub use row::{
    create_group_row, create_model_row, create_placeholder_row, is_data_row, is_footer_row, is_group_row,
    is_model_row, is_placeholder_row, GroupMeta, GroupRow, Row, RowData,
};
pub use session::{AdapterInput, GroupInput, HandleReport, TableSession};
pub use table::{ApplyOutcome, GroupSeed, Table};
