//! Table snapshots and the change-event interpreter.
//!
//! A `Table` is never mutated in place by callers. `apply` clones the
//! snapshot, interprets one event against the clone, then rebuilds every
//! derived part (group membership, group totals, footer, display order) from
//! scratch before handing the new snapshot back in an `ApplyOutcome`.

use std::sync::Arc;

use budgetgrid_core::{CellRef, CellValue, GroupId, ModelId, PlaceholderId, RowId};
use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::aggregate::sum_rows;
use crate::change::{CellChange, ChangeEvent, NewRow};
use crate::column::{is_editable, set_value, Columns};
use crate::diagnostics::Diagnostic;
use crate::entity::TableEntity;
use crate::row::{
    create_model_row, create_placeholder_row, is_data_row, is_placeholder_row, GroupMeta, GroupRow, Row,
    RowData,
};

/// A persisted group as delivered by a server snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSeed {
    pub group: GroupMeta,
    #[serde(default)]
    pub members: Vec<ModelId>,
}

impl GroupSeed {
    pub fn new(group: GroupMeta, members: Vec<ModelId>) -> Self {
        Self { group, members }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    columns: Arc<Columns>,
    /// Model and placeholder rows in table order.
    rows: Vec<Row>,
    /// `Row::Group` entries in creation order.
    groups: Vec<Row>,
    footer: Row,
    display: Vec<RowId>,
    /// Position of each data row in `rows`.
    index: FxHashMap<RowId, usize>,
    next_placeholder: PlaceholderId,
    revision: u64,
}

/// Result of applying one event (or a refresh/promotion) to a snapshot.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// The new snapshot; equal to the old one when nothing applied.
    pub table: Table,
    pub kind: &'static str,
    pub previous_revision: u64,
    /// Items that took effect.
    pub applied: usize,
    /// Items the event carried.
    pub total: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Displayed cells whose value differs from the previous snapshot.
    pub changed_cells: Vec<CellRef>,
    pub display_changed: bool,
}

impl ApplyOutcome {
    fn unchanged(table: &Table, kind: &'static str, total: usize, diagnostics: Vec<Diagnostic>) -> Self {
        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        Self {
            table: table.clone(),
            kind,
            previous_revision: table.revision,
            applied: 0,
            total,
            diagnostics,
            changed_cells: Vec::new(),
            display_changed: false,
        }
    }

    /// Whether a new revision was produced.
    pub fn changed(&self) -> bool {
        self.table.revision != self.previous_revision
    }

    /// One-line summary for debug logging.
    pub fn log_line(&self) -> String {
        format!(
            "{} rev {}->{} applied {}/{} cells {} display {} diagnostics {}",
            self.kind,
            self.previous_revision,
            self.table.revision,
            self.applied,
            self.total,
            self.changed_cells.len(),
            if self.display_changed { "changed" } else { "same" },
            self.diagnostics.len()
        )
    }
}

fn same_value(a: &CellValue, b: &CellValue) -> bool {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => OrderedFloat(*x) == OrderedFloat(*y),
        _ => a == b,
    }
}

fn model_rows<E: TableEntity>(columns: &Columns, entities: &[E], diagnostics: &mut Vec<Diagnostic>) -> Vec<Row> {
    let mut seen = FxHashSet::default();
    let mut rows = Vec::with_capacity(entities.len());
    for entity in entities {
        if !seen.insert(entity.id()) {
            diagnostics.push(Diagnostic::DuplicateModel(entity.id()));
            continue;
        }
        rows.push(create_model_row(columns, entity));
    }
    rows
}

impl Table {
    pub fn new(columns: Columns) -> Self {
        let columns = Arc::new(columns);
        let footer = Row::footer(sum_rows(&columns, std::iter::empty()));
        Self {
            columns,
            rows: Vec::new(),
            groups: Vec::new(),
            footer,
            display: vec![RowId::Footer],
            index: FxHashMap::default(),
            next_placeholder: PlaceholderId(1),
            revision: 0,
        }
    }

    /// Build a table from a server snapshot.
    pub fn from_entities<E: TableEntity>(columns: Columns, entities: &[E], groups: &[GroupSeed]) -> Self {
        let mut table = Self::new(columns);
        let mut diagnostics = Vec::new();
        table.rows = model_rows(&table.columns, entities, &mut diagnostics);
        table.groups = table.seed_groups(groups);
        table.recompute(&mut diagnostics);
        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        table
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The id the next placeholder row should use.
    pub fn next_placeholder(&self) -> PlaceholderId {
        self.next_placeholder
    }

    /// Up to `count` fresh placeholder ids, in order. Fewer come back only
    /// when the id space runs out.
    pub fn next_placeholder_ids(&self, count: usize) -> Vec<PlaceholderId> {
        let start = self.next_placeholder.raw();
        (0..count as u64).map_while(|i| start.checked_add(i).map(PlaceholderId)).collect()
    }

    /// Flattened display order: grouped rows each followed by their group
    /// row, then ungrouped rows, then the footer.
    pub fn display_order(&self) -> &[RowId] {
        &self.display
    }

    pub fn display_rows(&self) -> impl Iterator<Item = &Row> {
        self.display.iter().filter_map(|id| self.row(id))
    }

    pub fn display_index(&self, id: &RowId) -> Option<usize> {
        self.display.iter().position(|r| r == id)
    }

    /// Data rows in display order; the only rows navigation and paste visit.
    pub fn navigable_rows(&self) -> Vec<RowId> {
        self.display.iter().copied().filter(RowId::is_data).collect()
    }

    /// Model and placeholder rows in table order.
    pub fn data_rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: &RowId) -> Option<&Row> {
        match id {
            RowId::Model(_) | RowId::Placeholder(_) => self.index.get(id).map(|&i| &self.rows[i]),
            RowId::Group(group) => self.groups.iter().find(|r| r.id() == RowId::Group(*group)),
            RowId::Footer => Some(&self.footer),
        }
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.row(id).is_some()
    }

    pub fn footer(&self) -> &Row {
        &self.footer
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupRow> {
        self.groups.iter().filter_map(Row::as_group)
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupRow> {
        self.groups().find(|g| g.meta.id == id)
    }

    /// The group holding `row`, if any.
    pub fn group_of(&self, row: &RowId) -> Option<GroupId> {
        self.groups().find(|g| g.members.contains(row)).map(|g| g.meta.id)
    }

    pub fn value(&self, cell: &CellRef) -> Option<&CellValue> {
        self.row(&cell.row)?.value(cell.field.as_str())
    }

    pub fn is_cell_editable(&self, cell: &CellRef) -> bool {
        match (self.row(&cell.row), self.columns.get(cell.field.as_str())) {
            (Some(row), Some(column)) => is_editable(row, column),
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Apply one change event. Never panics; malformed input leaves the
    /// snapshot unchanged and is reported in `diagnostics`.
    pub fn apply(&self, event: &ChangeEvent) -> ApplyOutcome {
        let mut next = self.clone();
        let mut diagnostics = Vec::new();
        let applied = match event {
            ChangeEvent::DataChange { changes } => next.data_change(changes, &mut diagnostics),
            ChangeEvent::RowAdd { rows } => next.row_add(rows, &mut diagnostics),
            ChangeEvent::RowDelete { rows } => next.row_delete(rows, &mut diagnostics),
            ChangeEvent::RowAddToGroup { group, rows } => next.add_to_group(*group, rows, &mut diagnostics),
            ChangeEvent::RowRemoveFromGroup { group, rows } => {
                next.remove_from_group(*group, rows, &mut diagnostics)
            }
            ChangeEvent::GroupAdd { group, rows } => next.group_add(group, rows, &mut diagnostics),
            ChangeEvent::GroupUpdate { group } => next.group_update(group, &mut diagnostics),
            ChangeEvent::GroupDelete { group } => next.group_delete(*group, &mut diagnostics),
        };
        if applied == 0 {
            return ApplyOutcome::unchanged(self, event.kind(), event.len(), diagnostics);
        }
        self.commit(next, event.kind(), applied, event.len(), diagnostics)
    }

    /// Replace every model row and group with a fresh server snapshot.
    ///
    /// Placeholder rows survive after the model rows, and keep their
    /// membership in any group the snapshot still contains.
    pub fn refresh<E: TableEntity>(&self, entities: &[E], groups: &[GroupSeed]) -> ApplyOutcome {
        let mut diagnostics = Vec::new();
        let mut next = self.clone();
        let mut rows = model_rows(&self.columns, entities, &mut diagnostics);
        rows.extend(self.rows.iter().filter(|r| is_placeholder_row(r)).cloned());
        next.rows = rows;
        next.groups = self.seed_groups(groups);
        self.commit(next, "refresh", entities.len(), entities.len(), diagnostics)
    }

    /// Turn a placeholder into the model row persistence created for it,
    /// keeping its position and group.
    pub fn promote(&self, placeholder: PlaceholderId, entity: &dyn TableEntity) -> ApplyOutcome {
        let old = RowId::Placeholder(placeholder);
        let new = RowId::Model(entity.id());
        let Some(&position) = self.index.get(&old) else {
            return ApplyOutcome::unchanged(self, "promote", 1, vec![Diagnostic::UnknownRow(old)]);
        };
        if self.index.contains_key(&new) {
            return ApplyOutcome::unchanged(self, "promote", 1, vec![Diagnostic::DuplicateModel(entity.id())]);
        }

        let mut next = self.clone();
        next.rows[position] = create_model_row(&self.columns, entity);
        for group in next.groups.iter_mut().filter_map(Row::as_group_mut) {
            for member in group.members.iter_mut().filter(|m| **m == old) {
                *member = new;
            }
        }
        self.commit(next, "promote", 1, 1, Vec::new())
    }

    fn commit(
        &self,
        mut next: Table,
        kind: &'static str,
        applied: usize,
        total: usize,
        mut diagnostics: Vec<Diagnostic>,
    ) -> ApplyOutcome {
        next.recompute(&mut diagnostics);
        next.revision = self.revision + 1;
        for diagnostic in &diagnostics {
            diagnostic.log();
        }

        let changed_cells = self.changed_cells(&next);
        let display_changed = next.display != self.display;
        let outcome = ApplyOutcome {
            table: next,
            kind,
            previous_revision: self.revision,
            applied,
            total,
            diagnostics,
            changed_cells,
            display_changed,
        };
        log::debug!("{}", outcome.log_line());
        outcome
    }

    // ------------------------------------------------------------------------
    // Event handlers. Each works on the clone and returns the applied count.
    // ------------------------------------------------------------------------

    fn data_change(&mut self, changes: &[CellChange], diagnostics: &mut Vec<Diagnostic>) -> usize {
        let columns = Arc::clone(&self.columns);
        let mut applied = 0;
        for change in changes {
            let cell = change.cell();
            let Some(&position) = self.index.get(&change.row) else {
                diagnostics.push(if self.contains(&change.row) {
                    Diagnostic::NotEditable(cell)
                } else {
                    Diagnostic::UnknownRow(change.row)
                });
                continue;
            };
            let Some(column) = columns.get(change.field.as_str()) else {
                diagnostics.push(Diagnostic::UnknownField(cell));
                continue;
            };
            let row = &self.rows[position];
            if !is_editable(row, column) {
                diagnostics.push(Diagnostic::NotEditable(cell));
                continue;
            }
            match set_value(row, column, change.value.clone()) {
                Ok(data) => {
                    self.rows[position].set_data(data);
                    applied += 1;
                }
                Err(error) => diagnostics.push(Diagnostic::Rejected { cell, error }),
            }
        }
        applied
    }

    fn row_add(&mut self, rows: &[NewRow], diagnostics: &mut Vec<Diagnostic>) -> usize {
        let columns = Arc::clone(&self.columns);
        let mut applied = 0;
        for new in rows {
            let id = RowId::Placeholder(new.id);
            if self.index.contains_key(&id) {
                diagnostics.push(Diagnostic::DuplicateRow(new.id));
                continue;
            }
            if new.id < self.next_placeholder {
                diagnostics.push(Diagnostic::StalePlaceholder(new.id));
                continue;
            }
            let Some(after) = new.id.next() else {
                diagnostics.push(Diagnostic::PlaceholderExhausted(new.id));
                continue;
            };

            let mut values = Vec::with_capacity(new.values.len());
            for field_value in &new.values {
                let cell = CellRef::new(id, field_value.field.clone());
                let Some(column) = columns.get(field_value.field.as_str()) else {
                    diagnostics.push(Diagnostic::UnknownField(cell));
                    continue;
                };
                if column.is_action() {
                    diagnostics.push(Diagnostic::NotEditable(cell));
                    continue;
                }
                match column.coerce(Some(field_value.value.clone())) {
                    Ok(value) => values.push((field_value.field.clone(), value)),
                    Err(error) => diagnostics.push(Diagnostic::Rejected { cell, error }),
                }
            }

            self.index.insert(id, self.rows.len());
            self.rows.push(create_placeholder_row(&columns, new.id, values));
            self.next_placeholder = after;
            applied += 1;
        }
        applied
    }

    /// Rows that are not data rows of this table, reported as unknown.
    fn missing_rows(&self, rows: &[RowId], diagnostics: &mut Vec<Diagnostic>) -> bool {
        let mut missing = false;
        for row in rows.iter().filter(|r| !self.index.contains_key(*r)) {
            diagnostics.push(Diagnostic::UnknownRow(*row));
            missing = true;
        }
        missing
    }

    fn group_mut(&mut self, id: GroupId) -> Option<&mut GroupRow> {
        self.groups.iter_mut().filter_map(Row::as_group_mut).find(|g| g.meta.id == id)
    }

    /// Take `rows` out of every group except `keep`.
    fn detach(&mut self, rows: &[RowId], keep: Option<GroupId>) {
        for group in self.groups.iter_mut().filter_map(Row::as_group_mut) {
            if Some(group.meta.id) != keep {
                group.members.retain(|m| !rows.contains(m));
            }
        }
    }

    fn row_delete(&mut self, rows: &[RowId], diagnostics: &mut Vec<Diagnostic>) -> usize {
        if self.missing_rows(rows, diagnostics) {
            return 0;
        }
        let doomed: FxHashSet<RowId> = rows.iter().copied().collect();
        self.rows.retain(|r| !doomed.contains(&r.id()));
        self.detach(rows, None);
        doomed.len()
    }

    fn add_to_group(&mut self, group: GroupId, rows: &[RowId], diagnostics: &mut Vec<Diagnostic>) -> usize {
        if self.group(group).is_none() {
            diagnostics.push(Diagnostic::UnknownGroup(group));
            return 0;
        }
        if self.missing_rows(rows, diagnostics) {
            return 0;
        }
        self.detach(rows, Some(group));
        let Some(target) = self.group_mut(group) else {
            return 0;
        };
        for row in rows {
            if !target.members.contains(row) {
                target.members.push(*row);
            }
        }
        rows.len()
    }

    fn remove_from_group(&mut self, group: GroupId, rows: &[RowId], diagnostics: &mut Vec<Diagnostic>) -> usize {
        let Some(target) = self.group_mut(group) else {
            diagnostics.push(Diagnostic::UnknownGroup(group));
            return 0;
        };
        let strays: Vec<RowId> = rows.iter().filter(|r| !target.members.contains(r)).copied().collect();
        if !strays.is_empty() {
            diagnostics.extend(strays.into_iter().map(|row| Diagnostic::NotAMember { group, row }));
            return 0;
        }
        target.members.retain(|m| !rows.contains(m));
        rows.len()
    }

    fn group_add(&mut self, meta: &GroupMeta, rows: &[RowId], diagnostics: &mut Vec<Diagnostic>) -> usize {
        if let Some(existing) = self.group_mut(meta.id) {
            existing.meta = meta.clone();
            return 1;
        }
        if rows.is_empty() {
            diagnostics.push(Diagnostic::EmptyGroup(meta.id));
            return 0;
        }
        if self.missing_rows(rows, diagnostics) {
            return 0;
        }
        self.detach(rows, None);
        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            if !members.contains(row) {
                members.push(*row);
            }
        }
        self.groups.push(Row::Group(GroupRow { meta: meta.clone(), members, data: RowData::new() }));
        1
    }

    fn group_update(&mut self, meta: &GroupMeta, diagnostics: &mut Vec<Diagnostic>) -> usize {
        match self.group_mut(meta.id) {
            Some(existing) => {
                existing.meta = meta.clone();
                1
            }
            None => {
                diagnostics.push(Diagnostic::UnknownGroup(meta.id));
                0
            }
        }
    }

    fn group_delete(&mut self, group: GroupId, diagnostics: &mut Vec<Diagnostic>) -> usize {
        let before = self.groups.len();
        self.groups.retain(|r| r.id() != RowId::Group(group));
        if self.groups.len() == before {
            diagnostics.push(Diagnostic::UnknownGroup(group));
            return 0;
        }
        1
    }

    // ------------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------------

    /// Group rows for a server snapshot. Placeholder members of a group the
    /// snapshot still has are carried over.
    fn seed_groups(&self, seeds: &[GroupSeed]) -> Vec<Row> {
        let mut seen = FxHashSet::default();
        seeds
            .iter()
            .filter(|seed| seen.insert(seed.group.id))
            .map(|seed| {
                let mut members: Vec<RowId> = seed.members.iter().map(|&id| RowId::Model(id)).collect();
                if let Some(existing) = self.group(seed.group.id) {
                    members.extend(existing.members.iter().copied().filter(|m| matches!(m, RowId::Placeholder(_))));
                }
                Row::Group(GroupRow { meta: seed.group.clone(), members, data: RowData::new() })
            })
            .collect()
    }

    fn recompute(&mut self, diagnostics: &mut Vec<Diagnostic>) {
        self.index = self.rows.iter().enumerate().map(|(i, r)| (r.id(), i)).collect();
        let columns = Arc::clone(&self.columns);
        let rows = &self.rows;
        let index = &self.index;

        // A member must be displayed and may belong to one group only.
        let mut claimed = FxHashSet::default();
        for group in self.groups.iter_mut().filter_map(Row::as_group_mut) {
            let id = group.meta.id;
            group.members.retain(|member| {
                let keep = index.contains_key(member) && claimed.insert(*member);
                if !keep {
                    diagnostics.push(Diagnostic::PrunedMember { group: id, row: *member });
                }
                keep
            });
            group.members.sort_by_key(|member| index.get(member).copied());
            group.data = sum_rows(&columns, group.members.iter().filter_map(|m| index.get(m)).map(|&i| &rows[i]));
        }
        self.groups.retain(|r| r.as_group().is_some_and(|g| !g.members.is_empty()));

        self.footer = Row::footer(sum_rows(&columns, rows.iter().filter(|r| is_data_row(r))));

        let mut ordered: Vec<&GroupRow> = self.groups.iter().filter_map(Row::as_group).collect();
        ordered.sort_by_key(|g| g.members.first().and_then(|m| index.get(m)).copied());
        let mut display = Vec::with_capacity(rows.len() + ordered.len() + 1);
        for group in &ordered {
            display.extend(group.members.iter().copied());
            display.push(RowId::Group(group.meta.id));
        }
        display.extend(rows.iter().map(Row::id).filter(|id| !claimed.contains(id)));
        display.push(RowId::Footer);
        self.display = display;
    }

    /// Bring back an earlier snapshot as the next revision. The placeholder
    /// counter never moves backwards, so restored snapshots cannot reuse ids.
    pub(crate) fn restore(&self, mut snapshot: Table) -> Table {
        snapshot.revision = self.revision + 1;
        snapshot.next_placeholder = snapshot.next_placeholder.max(self.next_placeholder);
        snapshot
    }

    /// Displayed cells of `next` whose value differs from this snapshot.
    pub(crate) fn changed_cells(&self, next: &Table) -> Vec<CellRef> {
        let mut cells = Vec::new();
        for id in &next.display {
            let Some(new_row) = next.row(id) else { continue };
            let old_row = self.row(id);
            for column in next.columns.iter() {
                let field = column.field.as_str();
                let changed = match (old_row.and_then(|r| r.value(field)), new_row.value(field)) {
                    (Some(old), Some(new)) => !same_value(old, new),
                    (None, None) => false,
                    _ => true,
                };
                if changed {
                    cells.push(CellRef::new(*id, column.field.clone()));
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::entity::SubAccount;
    use budgetgrid_core::ColumnKind;

    fn columns() -> Columns {
        Columns::new(vec![
            Column::action("select"),
            Column::new("description", ColumnKind::Text),
            Column::new("quantity", ColumnKind::Number).aggregable(),
            Column::new("rate", ColumnKind::Currency).aggregable(),
            Column::new("estimated", ColumnKind::Currency).read_only().aggregable(),
        ])
    }

    fn sub(id: u64, quantity: f64, rate: f64) -> SubAccount {
        SubAccount {
            id: ModelId(id),
            description: Some(format!("Line {id}")),
            quantity: Some(quantity),
            rate: Some(rate),
            ..Default::default()
        }
    }

    fn table() -> Table {
        Table::from_entities(columns(), &[sub(1, 2.0, 12.5), sub(2, 1.0, 100.0), sub(3, 4.0, 10.0)], &[])
    }

    fn number(table: &Table, row: RowId, field: &str) -> f64 {
        table.value(&CellRef::new(row, field)).and_then(CellValue::as_number).unwrap_or(f64::NAN)
    }

    fn m(id: u64) -> RowId {
        RowId::Model(ModelId(id))
    }

    #[test]
    fn test_initial_display_and_footer() {
        let t = table();
        assert_eq!(t.display_order(), &[m(1), m(2), m(3), RowId::Footer]);
        assert_eq!(number(&t, RowId::Footer, "estimated"), 165.0);
        assert_eq!(number(&t, RowId::Footer, "quantity"), 7.0);
        assert_eq!(t.revision(), 0);
    }

    #[test]
    fn test_data_change_partially_applies() {
        let t = table();
        let event = ChangeEvent::data_change(vec![
            CellChange::new(ModelId(1), "rate", Some(CellValue::text("20"))),
            CellChange::new(ModelId(2), "estimated", Some(CellValue::Number(1.0))),
            CellChange::new(ModelId(3), "rate", Some(CellValue::text("abc"))),
            CellChange::new(ModelId(9), "rate", Some(CellValue::Number(1.0))),
        ]);
        let outcome = t.apply(&event);

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.total, 4);
        let codes: Vec<&str> = outcome.diagnostics.iter().map(Diagnostic::code).collect();
        assert_eq!(codes, vec!["not_editable", "rejected", "unknown_row"]);
        assert_eq!(number(&outcome.table, m(1), "rate"), 20.0);
        assert_eq!(number(&outcome.table, m(3), "rate"), 10.0);
        assert_eq!(outcome.table.revision(), 1);
        assert!(outcome.changed_cells.contains(&CellRef::new(ModelId(1), "rate")));
        assert!(outcome.changed_cells.contains(&CellRef::new(RowId::Footer, "rate")));
        assert!(!outcome.display_changed);
        // The input snapshot is untouched.
        assert_eq!(number(&t, m(1), "rate"), 12.5);
    }

    #[test]
    fn test_clearing_writes_null_sentinel() {
        let t = table();
        let outcome = t.apply(&ChangeEvent::data_change(vec![
            CellChange::new(ModelId(1), "description", None),
            CellChange::new(ModelId(1), "rate", None),
        ]));
        assert_eq!(outcome.table.value(&CellRef::new(ModelId(1), "description")), Some(&CellValue::text("")));
        assert_eq!(outcome.table.value(&CellRef::new(ModelId(1), "rate")), Some(&CellValue::Null));
        assert_eq!(number(&outcome.table, RowId::Footer, "rate"), 110.0);
    }

    #[test]
    fn test_writes_to_footer_are_not_editable() {
        let t = table();
        let outcome = t.apply(&ChangeEvent::set(RowId::Footer, "rate", Some(CellValue::Number(1.0))));
        assert!(!outcome.changed());
        assert_eq!(outcome.diagnostics[0].code(), "not_editable");
    }

    #[test]
    fn test_row_add_assigns_null_sentinels_and_rejects_reuse() {
        let t = table();
        let ids = t.next_placeholder_ids(2);
        let outcome = t.apply(&ChangeEvent::RowAdd {
            rows: vec![
                NewRow::new(ids[0]).with_value("description", CellValue::text("Grip")),
                NewRow::new(ids[1]),
            ],
        });
        assert_eq!(outcome.applied, 2);
        let t2 = outcome.table;
        let p0 = RowId::Placeholder(ids[0]);
        assert_eq!(t2.value(&CellRef::new(p0, "description")), Some(&CellValue::text("Grip")));
        assert_eq!(t2.value(&CellRef::new(p0, "rate")), Some(&CellValue::Null));
        assert_eq!(t2.display_order().len(), 6);
        assert!(outcome.display_changed);
        assert_eq!(Some(t2.next_placeholder()), ids[1].next());

        let again = t2.apply(&ChangeEvent::RowAdd { rows: vec![NewRow::new(ids[0])] });
        assert_eq!(again.applied, 0);
        assert_eq!(again.diagnostics, vec![Diagnostic::DuplicateRow(ids[0])]);

        let deleted = t2.apply(&ChangeEvent::RowDelete { rows: vec![p0] }).table;
        let stale = deleted.apply(&ChangeEvent::RowAdd { rows: vec![NewRow::new(ids[0])] });
        assert_eq!(stale.diagnostics, vec![Diagnostic::StalePlaceholder(ids[0])]);
    }

    #[test]
    fn test_row_add_with_last_placeholder_id_is_rejected() {
        let t = table();
        let json = r#"{"type":"rowAdd","rows":[{"id":18446744073709551615}]}"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        let outcome = t.apply(&event);
        assert!(!outcome.changed());
        assert_eq!(outcome.diagnostics, vec![Diagnostic::PlaceholderExhausted(PlaceholderId(u64::MAX))]);
        assert_eq!(outcome.table.next_placeholder(), t.next_placeholder());
    }

    #[test]
    fn test_next_placeholder_ids_stop_at_end_of_id_space() {
        let mut t = table();
        t.next_placeholder = PlaceholderId(u64::MAX - 1);
        assert_eq!(t.next_placeholder_ids(5), vec![PlaceholderId(u64::MAX - 1), PlaceholderId(u64::MAX)]);
    }

    #[test]
    fn test_row_delete_is_all_or_nothing() {
        let t = table();
        let outcome = t.apply(&ChangeEvent::RowDelete { rows: vec![m(1), m(42)] });
        assert!(!outcome.changed());
        assert_eq!(outcome.table.len(), 3);
        assert_eq!(outcome.diagnostics, vec![Diagnostic::UnknownRow(m(42))]);
    }

    #[test]
    fn test_groups_interleave_display_and_aggregate() {
        let t = table();
        let meta = GroupMeta::new(GroupId(7), "Crew").with_color("#aa0000");
        let grouped = t.apply(&ChangeEvent::GroupAdd { group: meta, rows: vec![m(3), m(2)] }).table;

        let g = RowId::Group(GroupId(7));
        assert_eq!(grouped.display_order(), &[m(2), m(3), g, m(1), RowId::Footer]);
        assert_eq!(grouped.group(GroupId(7)).unwrap().members, vec![m(2), m(3)]);
        assert_eq!(number(&grouped, g, "estimated"), 140.0);
        // Footer ignores group rows.
        assert_eq!(number(&grouped, RowId::Footer, "estimated"), 165.0);
        assert_eq!(grouped.group_of(&m(3)), Some(GroupId(7)));
        assert_eq!(grouped.navigable_rows(), vec![m(2), m(3), m(1)]);
    }

    #[test]
    fn test_group_membership_moves_and_empty_group_disappears() {
        let t = table()
            .apply(&ChangeEvent::GroupAdd { group: GroupMeta::new(GroupId(1), "A"), rows: vec![m(1)] })
            .table
            .apply(&ChangeEvent::GroupAdd { group: GroupMeta::new(GroupId(2), "B"), rows: vec![m(2)] })
            .table;

        let moved = t.apply(&ChangeEvent::RowAddToGroup { group: GroupId(2), rows: vec![m(1)] }).table;
        assert!(moved.group(GroupId(1)).is_none());
        assert_eq!(moved.group(GroupId(2)).unwrap().members, vec![m(1), m(2)]);
        assert_eq!(number(&moved, RowId::Group(GroupId(2)), "quantity"), 3.0);

        let removed = moved.apply(&ChangeEvent::RowRemoveFromGroup { group: GroupId(2), rows: vec![m(1)] }).table;
        assert_eq!(number(&removed, RowId::Group(GroupId(2)), "quantity"), 1.0);

        let emptied = removed.apply(&ChangeEvent::RowDelete { rows: vec![m(2)] }).table;
        assert_eq!(emptied.groups().count(), 0);
        assert_eq!(emptied.display_order(), &[m(1), m(3), RowId::Footer]);
    }

    #[test]
    fn test_group_add_upserts_metadata_only() {
        let t = table()
            .apply(&ChangeEvent::GroupAdd { group: GroupMeta::new(GroupId(1), "A"), rows: vec![m(1)] })
            .table;
        let renamed = t
            .apply(&ChangeEvent::GroupAdd { group: GroupMeta::new(GroupId(1), "Renamed"), rows: vec![m(2), m(3)] })
            .table;
        let g = renamed.group(GroupId(1)).unwrap();
        assert_eq!(g.meta.name, "Renamed");
        assert_eq!(g.members, vec![m(1)]);

        let update = renamed.apply(&ChangeEvent::GroupUpdate { group: GroupMeta::new(GroupId(5), "X") });
        assert_eq!(update.diagnostics, vec![Diagnostic::UnknownGroup(GroupId(5))]);

        let empty = renamed.apply(&ChangeEvent::GroupAdd { group: GroupMeta::new(GroupId(8), "E"), rows: vec![] });
        assert_eq!(empty.diagnostics, vec![Diagnostic::EmptyGroup(GroupId(8))]);
    }

    #[test]
    fn test_group_delete_ungroups_members() {
        let t = table()
            .apply(&ChangeEvent::GroupAdd { group: GroupMeta::new(GroupId(1), "A"), rows: vec![m(3)] })
            .table;
        assert_eq!(t.display_order()[0], m(3));
        let outcome = t.apply(&ChangeEvent::GroupDelete { group: GroupId(1) });
        assert_eq!(outcome.table.display_order(), &[m(1), m(2), m(3), RowId::Footer]);
        assert!(outcome.display_changed);
    }

    #[test]
    fn test_refresh_prunes_vanished_members() {
        let seeds = [GroupSeed::new(GroupMeta::new(GroupId(1), "A"), vec![ModelId(1), ModelId(2)])];
        let t = Table::from_entities(columns(), &[sub(1, 1.0, 1.0), sub(2, 1.0, 1.0)], &seeds);
        assert_eq!(t.group(GroupId(1)).unwrap().members.len(), 2);

        let outcome = t.refresh(&[sub(1, 1.0, 1.0)], &seeds);
        assert_eq!(outcome.table.group(GroupId(1)).unwrap().members, vec![m(1)]);
        assert!(outcome
            .diagnostics
            .contains(&Diagnostic::PrunedMember { group: GroupId(1), row: m(2) }));
    }

    #[test]
    fn test_promote_keeps_position_and_group() {
        let t = table();
        let id = t.next_placeholder();
        let t = t.apply(&ChangeEvent::RowAdd { rows: vec![NewRow::new(id)] }).table;
        let t = t
            .apply(&ChangeEvent::GroupAdd {
                group: GroupMeta::new(GroupId(4), "New"),
                rows: vec![RowId::Placeholder(id)],
            })
            .table;

        let outcome = t.promote(id, &sub(10, 1.0, 5.0));
        let promoted = outcome.table;
        assert_eq!(promoted.group(GroupId(4)).unwrap().members, vec![m(10)]);
        assert_eq!(promoted.data_rows()[3].id(), m(10));
        assert!(!promoted.contains(&RowId::Placeholder(id)));

        let missing = promoted.promote(id, &sub(11, 1.0, 1.0));
        assert_eq!(missing.diagnostics, vec![Diagnostic::UnknownRow(RowId::Placeholder(id))]);
    }

    #[test]
    fn test_log_line() {
        let outcome = table().apply(&ChangeEvent::set(ModelId(1), "rate", Some(CellValue::Number(3.0))));
        assert_eq!(outcome.log_line(), "dataChange rev 0->1 applied 1/1 cells 2 display same diagnostics 0");
    }
}
