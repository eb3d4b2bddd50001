//! Change events: the only way a table is mutated.
//!
//! Each event carries exactly one intent. Batching happens inside an event
//! (many cells in one `DataChange`, many rows in one `RowAdd`), never across
//! events.

use budgetgrid_core::{CellRef, CellValue, FieldKey, GroupId, PlaceholderId, RowId};
use serde::{Deserialize, Serialize};

use crate::row::GroupMeta;

/// One cell write. `value: None` means "absent" and is normalized to the
/// column's null sentinel by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellChange {
    pub row: RowId,
    pub field: FieldKey,
    #[serde(default)]
    pub value: Option<CellValue>,
}

impl CellChange {
    pub fn new(row: impl Into<RowId>, field: impl Into<FieldKey>, value: Option<CellValue>) -> Self {
        Self { row: row.into(), field: field.into(), value }
    }

    pub fn cell(&self) -> CellRef {
        CellRef { row: self.row, field: self.field.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub field: FieldKey,
    pub value: CellValue,
}

/// A placeholder row to append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRow {
    pub id: PlaceholderId,
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

impl NewRow {
    pub fn new(id: PlaceholderId) -> Self {
        Self { id, values: Vec::new() }
    }

    pub fn with_value(mut self, field: impl Into<FieldKey>, value: CellValue) -> Self {
        self.values.push(FieldValue { field: field.into(), value });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    DataChange { changes: Vec<CellChange> },
    RowAdd { rows: Vec<NewRow> },
    RowDelete { rows: Vec<RowId> },
    RowAddToGroup { group: GroupId, rows: Vec<RowId> },
    RowRemoveFromGroup { group: GroupId, rows: Vec<RowId> },
    /// Create a group with initial members, or update an existing group's
    /// metadata (members are then ignored).
    GroupAdd {
        group: GroupMeta,
        #[serde(default)]
        rows: Vec<RowId>,
    },
    GroupUpdate { group: GroupMeta },
    GroupDelete { group: GroupId },
}

impl ChangeEvent {
    pub fn data_change(changes: Vec<CellChange>) -> Self {
        ChangeEvent::DataChange { changes }
    }

    /// Single-cell write.
    pub fn set(row: impl Into<RowId>, field: impl Into<FieldKey>, value: Option<CellValue>) -> Self {
        ChangeEvent::DataChange { changes: vec![CellChange::new(row, field, value)] }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::DataChange { .. } => "dataChange",
            ChangeEvent::RowAdd { .. } => "rowAdd",
            ChangeEvent::RowDelete { .. } => "rowDelete",
            ChangeEvent::RowAddToGroup { .. } => "rowAddToGroup",
            ChangeEvent::RowRemoveFromGroup { .. } => "rowRemoveFromGroup",
            ChangeEvent::GroupAdd { .. } => "groupAdd",
            ChangeEvent::GroupUpdate { .. } => "groupUpdate",
            ChangeEvent::GroupDelete { .. } => "groupDelete",
        }
    }

    /// Number of items the event carries (cells, rows, or 1 for group metadata).
    pub fn len(&self) -> usize {
        match self {
            ChangeEvent::DataChange { changes } => changes.len(),
            ChangeEvent::RowAdd { rows } => rows.len(),
            ChangeEvent::RowDelete { rows }
            | ChangeEvent::RowAddToGroup { rows, .. }
            | ChangeEvent::RowRemoveFromGroup { rows, .. } => rows.len(),
            ChangeEvent::GroupAdd { .. } | ChangeEvent::GroupUpdate { .. } | ChangeEvent::GroupDelete { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
