//! Copy, cut, paste and range clear.
//!
//! Clipboard text is a TSV grid: `\t` between cells, `\n` between rows. Reference
//! lists travel as labels joined with the column's list separator.
//!
//! Nothing here mutates a table. Every operation produces change events for
//! the caller to apply in order.

use budgetgrid_config::EngineSettings;
use budgetgrid_core::{CellRange, CellRef, CellValue, PlaceholderId};

use crate::change::{CellChange, ChangeEvent, FieldValue, NewRow};
use crate::column::{is_editable, join_list, Column, DecodeError, EncodeError};
use crate::diagnostics::Diagnostic;
use crate::lookup::Lookup;
use crate::row::{create_placeholder_row, is_data_row, Row};
use crate::table::Table;

// ============================================================================
// Encoding
// ============================================================================

/// Text produced by a copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardExport {
    pub text: String,
    /// One `UnresolvedReference` per cell that was exported empty because a
    /// referenced id had no label.
    pub diagnostics: Vec<Diagnostic>,
}

impl ClipboardExport {
    pub fn unresolved_cells(&self) -> Vec<&CellRef> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UnresolvedReference { cell, .. } => Some(cell),
                _ => None,
            })
            .collect()
    }
}

/// Lookups only apply to reference columns.
fn reference_lookup(column: &Column) -> Option<&Lookup> {
    column.lookup.as_deref().filter(|_| column.kind.is_reference())
}

/// Cell text for the clipboard: the column's encoder, then its lookup, then
/// the default stringification.
pub fn encode_cell(column: &Column, value: &CellValue) -> Result<String, EncodeError> {
    let text = if let Some(encode) = &column.clipboard_encode {
        encode(value)?
    } else if let Some(lookup) = reference_lookup(column) {
        lookup.encode(value, column.list_separator)?
    } else {
        match value {
            CellValue::RefList(ids) => {
                let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
                join_list(&ids, column.list_separator)
            }
            other => other.raw_display(),
        }
    };
    // Keep the grid shape intact.
    Ok(text.replace(['\t', '\n', '\r'], " "))
}

/// Parse clipboard text for `column`. Blank text is the null sentinel.
pub fn decode_cell(column: &Column, text: &str) -> Result<CellValue, DecodeError> {
    if text.trim().is_empty() {
        return Ok(column.null_value.clone());
    }
    if let Some(decode) = &column.clipboard_decode {
        return decode(text);
    }
    if let Some(lookup) = reference_lookup(column) {
        return lookup.decode(text, column.kind, column.list_separator);
    }
    column
        .parse_text(text)
        .map_err(|_| DecodeError::Unparseable { kind: column.kind, text: text.to_string() })
}

/// Serialize `rows` x `columns` as TSV. Group rows and the footer are skipped.
pub fn to_clipboard_text(rows: &[&Row], columns: &[&Column]) -> ClipboardExport {
    let mut export = ClipboardExport::default();
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows.iter().filter(|r| is_data_row(r)) {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| {
                let value = row.value(column.field.as_str()).unwrap_or(&column.null_value);
                encode_cell(column, value).unwrap_or_else(|EncodeError::UnresolvedReference(id)| {
                    let cell = CellRef::new(row.id(), column.field.clone());
                    export.diagnostics.push(Diagnostic::UnresolvedReference { cell, id });
                    String::new()
                })
            })
            .collect();
        lines.push(cells.join("\t"));
    }
    export.text = lines.join("\n");
    export
}

/// Data cells covered by `range`, given in display coordinates (display row
/// index, grid column index). Group rows and the footer are skipped.
pub fn cells_in_range(table: &Table, range: &CellRange) -> Vec<CellRef> {
    let grid = table.columns().grid_columns();
    let mut cells = Vec::new();
    for row in range.rows() {
        let Some(id) = table.display_order().get(row).filter(|id| id.is_data()) else {
            continue;
        };
        for col in range.cols() {
            if let Some(column) = grid.get(col) {
                cells.push(CellRef::new(*id, column.field.clone()));
            }
        }
    }
    cells
}

impl Table {
    /// Export a rectangular selection given in display coordinates.
    pub fn copy_selection(&self, range: &CellRange) -> ClipboardExport {
        let grid = self.columns().grid_columns();
        let rows: Vec<&Row> = range
            .rows()
            .filter_map(|r| self.display_order().get(r))
            .filter_map(|id| self.row(id))
            .collect();
        let columns: Vec<&Column> = range.cols().filter_map(|c| grid.get(c).copied()).collect();
        to_clipboard_text(&rows, &columns)
    }

    /// Display coordinates of `cell`.
    pub fn grid_pos(&self, cell: &CellRef) -> Option<(usize, usize)> {
        Some((self.display_index(&cell.row)?, self.columns().grid_position(cell.field.as_str())?))
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Events and counters produced by a paste.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasteOutcome {
    /// Events to apply in order: at most one `DataChange` for existing rows
    /// followed by at most one `RowAdd` for overflow rows.
    pub events: Vec<ChangeEvent>,
    /// Placeholder ids created for overflow rows, in paste order.
    pub new_rows: Vec<PlaceholderId>,
    pub decode_failures: usize,
    pub skipped_read_only: usize,
    /// Pasted rows not written (growth disabled or row cap reached).
    pub dropped_rows: usize,
    /// Pasted columns beyond the last grid column.
    pub dropped_cols: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Normalize line endings, drop one trailing newline and split into cells.
fn split_grid(text: &str) -> Vec<Vec<String>> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
    if body.is_empty() {
        return Vec::new();
    }
    body.split('\n').map(|line| line.split('\t').map(str::to_string).collect()).collect()
}

/// Translate pasted TSV anchored at `anchor` into change events.
///
/// Cells align to the grid columns from the anchor column rightwards and to
/// the navigable rows from the anchor row downwards. Rows beyond the last
/// navigable row become new placeholder rows.
pub fn from_clipboard_text(text: &str, anchor: &CellRef, table: &Table, settings: &EngineSettings) -> PasteOutcome {
    let mut outcome = PasteOutcome::default();
    let grid = table.columns().grid_columns();

    let Some(start_col) = table.columns().grid_position(anchor.field.as_str()) else {
        outcome.diagnostics.push(Diagnostic::UnknownField(anchor.clone()));
        return outcome;
    };
    let navigable = table.navigable_rows();
    let Some(start_row) = navigable.iter().position(|r| *r == anchor.row) else {
        outcome.diagnostics.push(if table.contains(&anchor.row) {
            Diagnostic::NotEditable(anchor.clone())
        } else {
            Diagnostic::UnknownRow(anchor.row)
        });
        return outcome;
    };

    let mut lines = split_grid(text);
    if lines.len() > settings.max_paste_rows {
        outcome.dropped_rows += lines.len() - settings.max_paste_rows;
        lines.truncate(settings.max_paste_rows);
    }

    let targets = &navigable[start_row..];
    let available_cols = grid.len() - start_col;
    let overflow = lines.len().saturating_sub(targets.len());
    let new_ids = if settings.paste_grows_table { table.next_placeholder_ids(overflow) } else { Vec::new() };
    outcome.dropped_rows += overflow - new_ids.len();

    let mut changes = Vec::new();
    let mut new_rows = Vec::new();
    for (i, cells) in lines.iter().enumerate() {
        outcome.dropped_cols = outcome.dropped_cols.max(cells.len().saturating_sub(available_cols));
        let mut new_row = None;
        let blank;
        let row = match targets.get(i) {
            Some(id) => match table.row(id) {
                Some(row) => row,
                None => continue,
            },
            None => match new_ids.get(i - targets.len()) {
                Some(&id) => {
                    new_row = Some(NewRow::new(id));
                    blank = create_placeholder_row(table.columns(), id, Vec::new());
                    &blank
                }
                None => continue,
            },
        };
        let row_id = row.id();

        for (column, text) in grid[start_col..].iter().zip(cells.iter()) {
            let cell = CellRef::new(row_id, column.field.clone());
            if !is_editable(row, column) {
                outcome.skipped_read_only += 1;
                continue;
            }
            let value = decode_cell(column, text).unwrap_or_else(|_| {
                outcome.decode_failures += 1;
                outcome.diagnostics.push(Diagnostic::DecodeFailed { cell: cell.clone(), text: text.to_string() });
                column.null_value.clone()
            });
            match new_row.as_mut() {
                Some(new_row) => new_row.values.push(FieldValue { field: column.field.clone(), value }),
                None => changes.push(CellChange { row: row_id, field: column.field.clone(), value: Some(value) }),
            }
        }
        new_rows.extend(new_row);
    }

    if outcome.dropped_rows > 0 {
        outcome.diagnostics.push(Diagnostic::PasteTruncated { rows: outcome.dropped_rows });
    }
    if !changes.is_empty() {
        outcome.events.push(ChangeEvent::DataChange { changes });
    }
    if !new_rows.is_empty() {
        outcome.new_rows = new_rows.iter().map(|r| r.id).collect();
        outcome.events.push(ChangeEvent::RowAdd { rows: new_rows });
    }
    outcome
}

// ============================================================================
// Clear
// ============================================================================

/// One batched write of null sentinels over the editable `cells`.
pub fn clear_cells(table: &Table, cells: &[CellRef]) -> Option<ChangeEvent> {
    let changes: Vec<CellChange> = cells
        .iter()
        .filter(|cell| table.is_cell_editable(cell))
        .filter_map(|cell| {
            let column = table.columns().get(cell.field.as_str())?;
            Some(CellChange { row: cell.row, field: cell.field.clone(), value: Some(column.null_value.clone()) })
        })
        .collect();
    (!changes.is_empty()).then_some(ChangeEvent::DataChange { changes })
}

pub fn clear_range(table: &Table, range: &CellRange) -> Option<ChangeEvent> {
    clear_cells(table, &cells_in_range(table, range))
}

// ============================================================================
// Cut staging
// ============================================================================

/// Value removed by a single-cell cut, waiting to be moved by a paste.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedCut {
    pub cell: CellRef,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CutOutcome {
    pub export: ClipboardExport,
    /// Clears the cut cells; `None` when nothing in the range was editable.
    pub event: Option<ChangeEvent>,
}

/// Clipboard state that outlives a single gesture.
#[derive(Debug, Clone, Default)]
pub struct ClipboardState {
    staged: Option<StagedCut>,
}

impl ClipboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staged(&self) -> Option<&StagedCut> {
        self.staged.as_ref()
    }

    /// Copy replaces whatever a previous cut staged.
    pub fn copy(&mut self, table: &Table, range: &CellRange) -> ClipboardExport {
        self.staged = None;
        table.copy_selection(range)
    }

    /// Export the range and clear it. A single editable cell is staged so the
    /// next paste moves it instead of copying it.
    pub fn cut(&mut self, table: &Table, range: &CellRange) -> CutOutcome {
        let export = table.copy_selection(range);
        let cells = cells_in_range(table, range);
        self.staged = match cells.as_slice() {
            [cell] if table.is_cell_editable(cell) => {
                table.value(cell).map(|value| StagedCut { cell: cell.clone(), value: value.clone() })
            }
            _ => None,
        };
        CutOutcome { export, event: clear_cells(table, &cells) }
    }

    /// Paste, prefixed with a write restoring a staged cut cell.
    pub fn paste(&mut self, text: &str, anchor: &CellRef, table: &Table, settings: &EngineSettings) -> PasteOutcome {
        let mut outcome = from_clipboard_text(text, anchor, table, settings);
        if let Some(staged) = self.staged.take() {
            let restore = ChangeEvent::set(staged.cell.row, staged.cell.field, Some(staged.value));
            outcome.events.insert(0, restore);
        }
        outcome
    }

    /// Any write other than a paste discards the staged cut.
    pub fn note_write(&mut self) {
        self.staged = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Columns;
    use crate::entity::SubAccount;
    use crate::lookup::Lookup;
    use budgetgrid_core::{ColumnKind, ModelId, RowId};

    fn columns() -> Columns {
        Columns::new(vec![
            Column::action("select"),
            Column::new("description", ColumnKind::Text),
            Column::new("rate", ColumnKind::Currency).aggregable(),
            Column::new("unit", ColumnKind::SingleSelect).with_lookup(Lookup::new([(1, "Days"), (2, "Weeks")])),
            Column::new("fringes", ColumnKind::MultiSelect).with_lookup(Lookup::new([(5, "FICA"), (6, "Union")])),
            Column::new("estimated", ColumnKind::Currency).read_only(),
        ])
    }

    fn sub(id: u64, description: &str, rate: f64) -> SubAccount {
        SubAccount {
            id: ModelId(id),
            description: Some(description.to_string()),
            rate: Some(rate),
            unit: Some(1),
            fringes: vec![5, 6],
            ..Default::default()
        }
    }

    fn table() -> Table {
        Table::from_entities(columns(), &[sub(1, "Gaffer", 12.5), sub(2, "Grip", 10.0), sub(3, "Best Boy", 8.0)], &[])
    }

    #[test]
    fn test_copy_uses_lookups_and_skips_footer() {
        let t = table();
        // Row 3 is the footer.
        let export = t.copy_selection(&CellRange::new((0, 0), (3, 3)));
        assert_eq!(
            export.text,
            "Gaffer\t12.5\tDays\tFICA, Union\nGrip\t10\tDays\tFICA, Union\nBest Boy\t8\tDays\tFICA, Union"
        );
        assert!(export.diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_reference_exports_empty_cell() {
        let columns = columns();
        let mut sub = sub(1, "Gaffer", 1.0);
        sub.unit = Some(99);
        let t = Table::from_entities(columns, &[sub], &[]);
        let export = t.copy_selection(&CellRange::new((0, 2), (0, 2)));
        assert_eq!(export.text, "");
        assert_eq!(export.unresolved_cells(), vec![&CellRef::new(ModelId(1), "unit")]);
    }

    #[test]
    fn test_encode_replaces_grid_separators() {
        let column = Column::new("notes", ColumnKind::LongText);
        assert_eq!(encode_cell(&column, &CellValue::text("a\tb\nc")).unwrap(), "a b c");
    }

    #[test]
    fn test_decode_failure_writes_null_sentinel() {
        let t = table();
        let anchor = CellRef::new(ModelId(1), "rate");
        let outcome = from_clipboard_text("abc\tWeeks\n", &anchor, &t, &EngineSettings::default());
        assert_eq!(outcome.decode_failures, 1);
        assert_eq!(
            outcome.events,
            vec![ChangeEvent::data_change(vec![
                CellChange::new(ModelId(1), "rate", Some(CellValue::Null)),
                CellChange::new(ModelId(1), "unit", Some(CellValue::Ref(2))),
            ])]
        );
    }

    #[test]
    fn test_paste_skips_read_only_and_drops_extra_columns() {
        let t = table();
        let anchor = CellRef::new(ModelId(2), "fringes");
        let outcome = from_clipboard_text("Union\t50\textra\r\n", &anchor, &t, &EngineSettings::default());
        assert_eq!(outcome.skipped_read_only, 1);
        assert_eq!(outcome.dropped_cols, 1);
        assert_eq!(
            outcome.events,
            vec![ChangeEvent::set(ModelId(2), "fringes", Some(CellValue::RefList(vec![6])))]
        );
    }

    #[test]
    fn test_paste_overflow_disabled() {
        let t = table();
        let settings = EngineSettings { paste_grows_table: false, ..EngineSettings::default() };
        let anchor = CellRef::new(ModelId(3), "description");
        let outcome = from_clipboard_text("a\nb\nc", &anchor, &t, &settings);
        assert_eq!(outcome.dropped_rows, 2);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.diagnostics, vec![Diagnostic::PasteTruncated { rows: 2 }]);
    }

    #[test]
    fn test_paste_row_cap() {
        let t = table();
        let settings = EngineSettings { max_paste_rows: 2, ..EngineSettings::default() };
        let anchor = CellRef::new(ModelId(1), "description");
        let outcome = from_clipboard_text("a\nb\nc\nd", &anchor, &t, &settings);
        assert_eq!(outcome.dropped_rows, 2);
        assert!(outcome.new_rows.is_empty());
    }

    #[test]
    fn test_lookup_ignored_on_non_reference_column() {
        let column = Column::new("description", ColumnKind::Text).with_lookup(Lookup::new([(1, "Days")]));
        assert_eq!(encode_cell(&column, &CellValue::text("Days")).unwrap(), "Days");
        assert_eq!(decode_cell(&column, "Days").unwrap(), CellValue::text("Days"));
    }

    #[test]
    fn test_paste_on_footer_is_rejected() {
        let t = table();
        let anchor = CellRef::new(RowId::Footer, "rate");
        let outcome = from_clipboard_text("1", &anchor, &t, &EngineSettings::default());
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.diagnostics[0].code(), "not_editable");
    }

    #[test]
    fn test_clear_range_writes_sentinels_in_one_event() {
        let t = table();
        let event = clear_range(&t, &CellRange::new((0, 0), (3, 4))).unwrap();
        let ChangeEvent::DataChange { changes } = &event else {
            panic!("expected a data change");
        };
        // 3 data rows x 4 editable columns; the footer and "estimated" are skipped.
        assert_eq!(changes.len(), 12);
        assert!(changes.contains(&CellChange::new(ModelId(1), "description", Some(CellValue::text("")))));
        assert!(changes.contains(&CellChange::new(ModelId(1), "fringes", Some(CellValue::RefList(vec![])))));
        assert!(changes.contains(&CellChange::new(ModelId(2), "rate", Some(CellValue::Null))));
    }

    #[test]
    fn test_multi_cell_cut_stages_nothing() {
        let t = table();
        let mut state = ClipboardState::new();
        let cut = state.cut(&t, &CellRange::new((0, 0), (1, 0)));
        assert!(state.staged().is_none());
        assert_eq!(cut.export.text, "Gaffer\nGrip");
        assert!(cut.event.is_some());
    }

    #[test]
    fn test_single_cell_cut_stages_and_note_write_discards() {
        let t = table();
        let mut state = ClipboardState::new();
        let cut = state.cut(&t, &CellRange::single((0, 1)));
        assert_eq!(cut.export.text, "12.5");
        assert_eq!(
            state.staged(),
            Some(&StagedCut { cell: CellRef::new(ModelId(1), "rate"), value: CellValue::Number(12.5) })
        );
        state.note_write();
        assert!(state.staged().is_none());
    }
}
