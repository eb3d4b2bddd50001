//! Non-fatal problems reported alongside a result.
//!
//! Every failure in the engine degrades to "this cell or row did not change"
//! plus one of these, so the caller can surface it.

use std::fmt;

use budgetgrid_core::{CellRef, GroupId, ModelId, PlaceholderId, RowId};

use crate::column::SetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Expected during normal use (read-only cell skipped, stale member pruned).
    Info,
    /// The caller asked for something that could not be done.
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An event referenced a row that is not in the table.
    UnknownRow(RowId),
    /// An event referenced a group that does not exist.
    UnknownGroup(GroupId),
    /// A cell write named a field with no column.
    UnknownField(CellRef),
    /// A cell write targeted a read-only cell.
    NotEditable(CellRef),
    /// The column declined the value.
    Rejected { cell: CellRef, error: SetError },
    /// `rowAdd` reused a placeholder id that is already displayed.
    DuplicateRow(PlaceholderId),
    /// An entity id appeared twice in one snapshot, or a promotion targeted
    /// an id already displayed.
    DuplicateModel(ModelId),
    /// `rowAdd` used a placeholder id older than the table's counter.
    StalePlaceholder(PlaceholderId),
    /// `rowAdd` used the last representable placeholder id.
    PlaceholderExhausted(PlaceholderId),
    /// `rowRemoveFromGroup` named a row the group does not hold.
    NotAMember { group: GroupId, row: RowId },
    /// A new group was declared without members.
    EmptyGroup(GroupId),
    /// A group member no longer in the table was dropped.
    PrunedMember { group: GroupId, row: RowId },
    /// Pasted text could not be decoded; the null sentinel was written.
    DecodeFailed { cell: CellRef, text: String },
    /// A reference had no label on copy; an empty cell was written.
    UnresolvedReference { cell: CellRef, id: u64 },
    /// Paste rows that were not written (growth disabled or row cap hit).
    PasteTruncated { rows: usize },
}

impl Diagnostic {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::UnknownRow(_) => "unknown_row",
            Diagnostic::UnknownGroup(_) => "unknown_group",
            Diagnostic::UnknownField(_) => "unknown_field",
            Diagnostic::NotEditable(_) => "not_editable",
            Diagnostic::Rejected { .. } => "rejected",
            Diagnostic::DuplicateRow(_) => "duplicate_row",
            Diagnostic::DuplicateModel(_) => "duplicate_model",
            Diagnostic::StalePlaceholder(_) => "stale_placeholder",
            Diagnostic::PlaceholderExhausted(_) => "placeholder_exhausted",
            Diagnostic::NotAMember { .. } => "not_a_member",
            Diagnostic::EmptyGroup(_) => "empty_group",
            Diagnostic::PrunedMember { .. } => "pruned_member",
            Diagnostic::DecodeFailed { .. } => "decode_failed",
            Diagnostic::UnresolvedReference { .. } => "unresolved_reference",
            Diagnostic::PasteTruncated { .. } => "paste_truncated",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::NotEditable(_) | Diagnostic::PrunedMember { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Log through the `log` facade at a level matching the severity.
    pub fn log(&self) {
        match self.severity() {
            Severity::Info => log::debug!("{}: {}", self.code(), self),
            Severity::Warning => log::warn!("{}: {}", self.code(), self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownRow(row) => write!(f, "row {row} does not exist"),
            Diagnostic::UnknownGroup(group) => write!(f, "group {} does not exist", group.raw()),
            Diagnostic::UnknownField(cell) => write!(f, "no column for {cell}"),
            Diagnostic::NotEditable(cell) => write!(f, "{cell} is read-only"),
            Diagnostic::Rejected { cell, error } => write!(f, "{cell}: {error}"),
            Diagnostic::DuplicateRow(id) => write!(f, "placeholder {} already exists", id.raw()),
            Diagnostic::DuplicateModel(id) => write!(f, "row {} already exists", id.raw()),
            Diagnostic::StalePlaceholder(id) => write!(f, "placeholder {} was already used", id.raw()),
            Diagnostic::PlaceholderExhausted(id) => write!(f, "placeholder {} is past the last usable id", id.raw()),
            Diagnostic::NotAMember { group, row } => {
                write!(f, "row {row} is not in group {}", group.raw())
            }
            Diagnostic::EmptyGroup(group) => write!(f, "group {} has no members", group.raw()),
            Diagnostic::PrunedMember { group, row } => {
                write!(f, "removed missing row {row} from group {}", group.raw())
            }
            Diagnostic::DecodeFailed { cell, text } => write!(f, "{cell}: could not read '{text}'"),
            Diagnostic::UnresolvedReference { cell, id } => write!(f, "{cell}: reference {id} has no label"),
            Diagnostic::PasteTruncated { rows } => write!(f, "{rows} pasted rows were dropped"),
        }
    }
}

impl std::error::Error for Diagnostic {}
