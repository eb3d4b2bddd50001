//! Table session: the stateful edge the grid adapter talks to.
//!
//! `TableSession` owns the current snapshot and:
//! - translates adapter input into change events, applied strictly in order
//! - keeps one undo entry per gesture (a paste that grows the table is one
//!   entry even though it applies two events)
//! - forwards `TableEvent`s to an optional callback

use budgetgrid_config::EngineSettings;
use budgetgrid_core::{CellRange, CellRef, CellValue, GroupId, PlaceholderId, RowId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::change::{ChangeEvent, FieldValue, NewRow};
use crate::clipboard::{clear_cells, ClipboardExport, ClipboardState, PasteOutcome};
use crate::diagnostics::Diagnostic;
use crate::entity::TableEntity;
use crate::events::{AppliedEvent, CellsChangedEvent, EventCallback, RevisionChangedEvent, TableEvent};
use crate::navigation::{next_cell, NavKey, NavOutcome};
use crate::row::GroupMeta;
use crate::table::{ApplyOutcome, GroupSeed, Table};

/// Group mutation requested by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum GroupInput {
    Create { group: GroupMeta, rows: Vec<RowId> },
    Update { group: GroupMeta },
    Delete { group: GroupId },
    AddRows { group: GroupId, rows: Vec<RowId> },
    RemoveRows { group: GroupId, rows: Vec<RowId> },
}

impl GroupInput {
    pub fn into_event(self) -> ChangeEvent {
        match self {
            GroupInput::Create { group, rows } => ChangeEvent::GroupAdd { group, rows },
            GroupInput::Update { group } => ChangeEvent::GroupUpdate { group },
            GroupInput::Delete { group } => ChangeEvent::GroupDelete { group },
            GroupInput::AddRows { group, rows } => ChangeEvent::RowAddToGroup { group, rows },
            GroupInput::RemoveRows { group, rows } => ChangeEvent::RowRemoveFromGroup { group, rows },
        }
    }
}

/// Pre-normalized input from the grid widget. One input is one gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AdapterInput {
    /// A cell editor closed. `value: None` is a cleared editor.
    Edit { cell: CellRef, value: Option<CellValue> },
    Paste { anchor: CellRef, text: String },
    Cut { range: CellRange },
    Clear { cells: Vec<CellRef> },
    AddRow {
        #[serde(default)]
        values: Vec<FieldValue>,
    },
    DeleteRows { rows: Vec<RowId> },
    Group(GroupInput),
}

/// What one gesture did.
#[derive(Debug, Clone, Default)]
pub struct HandleReport {
    /// Kinds of the events applied, in order.
    pub kinds: Vec<&'static str>,
    pub applied: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Cells to repaint, without duplicates.
    pub changed_cells: Vec<CellRef>,
    pub display_changed: bool,
    /// Text to place on the system clipboard (cut).
    pub export: Option<ClipboardExport>,
    /// Paste counters (paste).
    pub paste: Option<PasteOutcome>,
    /// Placeholder rows this gesture created.
    pub new_rows: Vec<PlaceholderId>,
}

impl HandleReport {
    fn absorb(&mut self, outcome: &ApplyOutcome, seen: &mut FxHashSet<CellRef>) {
        self.kinds.push(outcome.kind);
        self.applied += outcome.applied;
        self.diagnostics.extend(outcome.diagnostics.iter().cloned());
        for cell in &outcome.changed_cells {
            if seen.insert(cell.clone()) {
                self.changed_cells.push(cell.clone());
            }
        }
        self.display_changed |= outcome.display_changed;
    }
}

pub struct TableSession {
    table: Table,
    settings: EngineSettings,
    clipboard: ClipboardState,
    undo_stack: Vec<Table>,
    redo_stack: Vec<Table>,
    callback: Option<EventCallback>,
}

impl TableSession {
    pub fn new(table: Table, settings: EngineSettings) -> Self {
        Self {
            table,
            settings,
            clipboard: ClipboardState::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: EventCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Option<EventCallback>) {
        self.callback = callback;
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn clipboard(&self) -> &ClipboardState {
        &self.clipboard
    }

    pub fn revision(&self) -> u64 {
        self.table.revision()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Apply one change event as its own gesture.
    pub fn apply(&mut self, event: ChangeEvent) -> HandleReport {
        self.clipboard.note_write();
        self.run(vec![event])
    }

    /// Translate and apply one adapter gesture.
    pub fn handle(&mut self, input: AdapterInput) -> HandleReport {
        match input {
            AdapterInput::Edit { cell, value } => {
                self.clipboard.note_write();
                self.run(vec![ChangeEvent::set(cell.row, cell.field, value)])
            }
            AdapterInput::Paste { anchor, text } => {
                let paste = self.clipboard.paste(&text, &anchor, &self.table, &self.settings);
                let mut report = self.run(paste.events.clone());
                let mut diagnostics = paste.diagnostics.clone();
                diagnostics.append(&mut report.diagnostics);
                report.diagnostics = diagnostics;
                report.new_rows = paste.new_rows.clone();
                report.paste = Some(paste);
                report
            }
            AdapterInput::Cut { range } => {
                let cut = self.clipboard.cut(&self.table, &range);
                let mut report = self.run(cut.event.into_iter().collect());
                report.export = Some(cut.export);
                report
            }
            AdapterInput::Clear { cells } => {
                self.clipboard.note_write();
                let event = clear_cells(&self.table, &cells);
                self.run(event.into_iter().collect())
            }
            AdapterInput::AddRow { values } => {
                self.clipboard.note_write();
                let id = self.table.next_placeholder();
                let mut report = self.run(vec![ChangeEvent::RowAdd { rows: vec![NewRow { id, values }] }]);
                if report.applied > 0 {
                    report.new_rows.push(id);
                }
                report
            }
            AdapterInput::DeleteRows { rows } => {
                self.clipboard.note_write();
                self.run(vec![ChangeEvent::RowDelete { rows }])
            }
            AdapterInput::Group(group) => {
                self.clipboard.note_write();
                self.run(vec![group.into_event()])
            }
        }
    }

    /// Export a selection. Discards any staged cut.
    pub fn copy(&mut self, range: &CellRange) -> ClipboardExport {
        self.clipboard.copy(&self.table, range)
    }

    /// Move focus, appending a row first when the move requires one.
    pub fn navigate(&mut self, from: &CellRef, key: NavKey) -> Option<NavOutcome> {
        let outcome = next_cell(&self.table, from, key, &self.settings)?;
        if let Some(event) = &outcome.event {
            self.clipboard.note_write();
            self.run(vec![event.clone()]);
        }
        Some(outcome)
    }

    /// Replace model rows and groups with a server snapshot. Undo history is
    /// dropped: older snapshots would resurrect stale rows.
    pub fn refresh<E: TableEntity>(&mut self, entities: &[E], groups: &[GroupSeed]) -> HandleReport {
        let outcome = self.table.refresh(entities, groups);
        self.clear_history();
        self.commit_single(outcome)
    }

    /// Swap a placeholder for its persisted model row.
    pub fn promote(&mut self, placeholder: PlaceholderId, entity: &dyn TableEntity) -> HandleReport {
        let outcome = self.table.promote(placeholder, entity);
        if outcome.changed() {
            self.clear_history();
        }
        self.commit_single(outcome)
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let restored = self.table.restore(snapshot);
        let previous = std::mem::replace(&mut self.table, restored);
        self.emit_restore(&previous);
        self.redo_stack.push(previous);
        self.clipboard.note_write();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let restored = self.table.restore(snapshot);
        let previous = std::mem::replace(&mut self.table, restored);
        self.emit_restore(&previous);
        self.undo_stack.push(previous);
        self.clipboard.note_write();
        true
    }

    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    // ------------------------------------------------------------------------

    /// Apply the events of one gesture in order, recording one undo entry.
    fn run(&mut self, events: Vec<ChangeEvent>) -> HandleReport {
        let before = self.table.clone();
        let mut report = HandleReport::default();
        let mut seen = FxHashSet::default();
        for event in &events {
            let outcome = self.table.apply(event);
            self.emit(&outcome);
            report.absorb(&outcome, &mut seen);
            self.table = outcome.table;
        }
        if self.table.revision() != before.revision() {
            self.push_undo(before);
        }
        report
    }

    fn commit_single(&mut self, outcome: ApplyOutcome) -> HandleReport {
        let mut report = HandleReport::default();
        self.emit(&outcome);
        report.absorb(&outcome, &mut FxHashSet::default());
        self.table = outcome.table;
        report
    }

    fn push_undo(&mut self, snapshot: Table) {
        if self.settings.max_history_entries == 0 {
            return;
        }
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.settings.max_history_entries {
            self.undo_stack.remove(0);
        }
    }

    fn send(&mut self, event: TableEvent) {
        if let Some(callback) = self.callback.as_mut() {
            callback(event);
        }
    }

    /// RevisionChanged, CellsChanged and DisplayOrderChanged for a new
    /// revision, then Applied.
    fn emit(&mut self, outcome: &ApplyOutcome) {
        if self.callback.is_none() {
            return;
        }
        let revision = outcome.table.revision();
        if outcome.changed() {
            self.send(TableEvent::RevisionChanged(RevisionChangedEvent {
                revision,
                previous: outcome.previous_revision,
            }));
            if !outcome.changed_cells.is_empty() {
                self.send(TableEvent::CellsChanged(CellsChangedEvent {
                    revision,
                    cells: outcome.changed_cells.clone(),
                }));
            }
            if outcome.display_changed {
                self.send(TableEvent::DisplayOrderChanged { revision });
            }
        }
        self.send(TableEvent::Applied(AppliedEvent {
            kind: outcome.kind,
            revision,
            applied: outcome.applied,
            total: outcome.total,
            diagnostics: outcome.diagnostics.iter().map(Diagnostic::code).collect(),
        }));
    }

    fn emit_restore(&mut self, previous: &Table) {
        if self.callback.is_none() {
            return;
        }
        let revision = self.table.revision();
        let cells = previous.changed_cells(&self.table);
        let display_changed = previous.display_order() != self.table.display_order();
        self.send(TableEvent::RevisionChanged(RevisionChangedEvent { revision, previous: previous.revision() }));
        if !cells.is_empty() {
            self.send(TableEvent::CellsChanged(CellsChangedEvent { revision, cells }));
        }
        if display_changed {
            self.send(TableEvent::DisplayOrderChanged { revision });
        }
    }
}
