//! Keyboard focus movement.
//!
//! Vertical movement walks the navigable rows (model and placeholder rows in
//! display order), so group rows and the footer are never targets. Horizontal
//! movement walks the grid columns and steps over cells that are not editable
//! for the current row.

use budgetgrid_config::EngineSettings;
use budgetgrid_core::{CellRef, RowId};
use serde::{Deserialize, Serialize};

use crate::change::{ChangeEvent, NewRow};
use crate::column::{is_editable, Column};
use crate::row::{create_placeholder_row, Row};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Tab,
    ShiftTab,
    Enter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavOutcome {
    pub target: CellRef,
    /// A one-row `RowAdd` to apply before focusing `target`.
    pub event: Option<ChangeEvent>,
}

impl NavOutcome {
    fn stay(target: CellRef) -> Self {
        Self { target, event: None }
    }
}

fn editable_columns<'a>(row: &Row, grid: &[&'a Column]) -> Vec<(usize, &'a Column)> {
    grid.iter().copied().enumerate().filter(|(_, c)| is_editable(row, c)).collect()
}

/// Move focus from `from` for `key`.
///
/// Returns `None` when `from` is not a navigable cell.
pub fn next_cell(table: &Table, from: &CellRef, key: NavKey, settings: &EngineSettings) -> Option<NavOutcome> {
    let rows = table.navigable_rows();
    let grid = table.columns().grid_columns();
    let r = rows.iter().position(|id| *id == from.row)?;
    let c = grid.iter().position(|col| col.field == from.field)?;
    let row = table.row(&from.row)?;
    let at = |row: RowId, col: &Column| CellRef::new(row, col.field.clone());

    let outcome = match key {
        NavKey::Up => match r.checked_sub(1) {
            Some(prev) => NavOutcome::stay(CellRef::new(rows[prev], from.field.clone())),
            None => NavOutcome::stay(from.clone()),
        },
        NavKey::Down => match rows.get(r + 1) {
            Some(next) => NavOutcome::stay(CellRef::new(*next, from.field.clone())),
            None => NavOutcome::stay(from.clone()),
        },
        NavKey::Enter => match rows.get(r + 1) {
            Some(next) => NavOutcome::stay(CellRef::new(*next, from.field.clone())),
            None if settings.enter_appends_row => {
                let (id, event) = append_row(table);
                NavOutcome { target: CellRef::new(id, from.field.clone()), event: Some(event) }
            }
            None => NavOutcome::stay(from.clone()),
        },
        NavKey::Left => {
            let target = editable_columns(row, &grid).into_iter().rev().find(|(i, _)| *i < c);
            NavOutcome::stay(target.map_or_else(|| from.clone(), |(_, col)| at(from.row, col)))
        }
        NavKey::Right => {
            let target = editable_columns(row, &grid).into_iter().find(|(i, _)| *i > c);
            NavOutcome::stay(target.map_or_else(|| from.clone(), |(_, col)| at(from.row, col)))
        }
        NavKey::Tab => {
            if let Some((_, col)) = editable_columns(row, &grid).into_iter().find(|(i, _)| *i > c) {
                return Some(NavOutcome::stay(at(from.row, col)));
            }
            for id in &rows[r + 1..] {
                let Some(next) = table.row(id) else { continue };
                if let Some((_, col)) = editable_columns(next, &grid).first() {
                    return Some(NavOutcome::stay(at(*id, col)));
                }
            }
            if !settings.tab_appends_row {
                return Some(NavOutcome::stay(from.clone()));
            }
            let (id, event) = append_row(table);
            let blank = match id {
                RowId::Placeholder(p) => create_placeholder_row(table.columns(), p, Vec::new()),
                _ => return Some(NavOutcome::stay(from.clone())),
            };
            match editable_columns(&blank, &grid).first() {
                Some((_, col)) => NavOutcome { target: at(id, col), event: Some(event) },
                None => NavOutcome::stay(from.clone()),
            }
        }
        NavKey::ShiftTab => {
            if let Some((_, col)) = editable_columns(row, &grid).into_iter().rev().find(|(i, _)| *i < c) {
                return Some(NavOutcome::stay(at(from.row, col)));
            }
            for id in rows[..r].iter().rev() {
                let Some(prev) = table.row(id) else { continue };
                if let Some((_, col)) = editable_columns(prev, &grid).last() {
                    return Some(NavOutcome::stay(at(*id, col)));
                }
            }
            NavOutcome::stay(from.clone())
        }
    };
    Some(outcome)
}

/// A one-row append using the table's next placeholder id.
fn append_row(table: &Table) -> (RowId, ChangeEvent) {
    let id = table.next_placeholder();
    (RowId::Placeholder(id), ChangeEvent::RowAdd { rows: vec![NewRow::new(id)] })
}

/// The first editable cell of the table, if any.
pub fn first_cell(table: &Table) -> Option<CellRef> {
    let grid = table.columns().grid_columns();
    table.navigable_rows().into_iter().find_map(|id| {
        let row = table.row(&id)?;
        editable_columns(row, &grid).first().map(|(_, col)| CellRef::new(id, col.field.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Columns;
    use crate::entity::SubAccount;
    use crate::row::GroupMeta;
    use budgetgrid_core::{ColumnKind, GroupId, ModelId};

    fn columns() -> Columns {
        Columns::new(vec![
            Column::action("expand"),
            Column::new("description", ColumnKind::Text),
            Column::new("quantity", ColumnKind::Number).editable_when(|row| row.children().is_empty()),
            Column::new("notes", ColumnKind::Text).hidden(),
            Column::new("rate", ColumnKind::Currency).editable_when(|row| row.children().is_empty()),
            Column::new("estimated", ColumnKind::Currency).read_only(),
        ])
    }

    fn table() -> Table {
        let parent = SubAccount { id: ModelId(2), children: vec![ModelId(20)], ..Default::default() };
        Table::from_entities(
            columns(),
            &[
                SubAccount { id: ModelId(1), ..Default::default() },
                parent,
                SubAccount { id: ModelId(3), ..Default::default() },
            ],
            &[],
        )
    }

    fn cell(row: u64, field: &str) -> CellRef {
        CellRef::new(ModelId(row), field)
    }

    fn go(table: &Table, from: &CellRef, key: NavKey) -> NavOutcome {
        next_cell(table, from, key, &EngineSettings::default()).unwrap()
    }

    #[test]
    fn test_vertical_skips_group_rows() {
        let t = table()
            .apply(&ChangeEvent::GroupAdd { group: GroupMeta::new(GroupId(1), "G"), rows: vec![ModelId(1).into()] })
            .table;
        // Display: 1, group, 2, 3, footer.
        let down = go(&t, &cell(1, "rate"), NavKey::Down);
        assert_eq!(down.target, cell(2, "rate"));
        let up = go(&t, &cell(2, "rate"), NavKey::Up);
        assert_eq!(up.target, cell(1, "rate"));
        assert_eq!(go(&t, &cell(3, "rate"), NavKey::Down).target, cell(3, "rate"));
    }

    #[test]
    fn test_horizontal_skips_locked_hidden_and_action_columns() {
        let t = table();
        assert_eq!(go(&t, &cell(1, "description"), NavKey::Right).target, cell(1, "quantity"));
        assert_eq!(go(&t, &cell(1, "quantity"), NavKey::Right).target, cell(1, "rate"));
        assert_eq!(go(&t, &cell(1, "rate"), NavKey::Right).target, cell(1, "rate"));
        // Row 2 has children, so quantity and rate are locked.
        assert_eq!(go(&t, &cell(2, "description"), NavKey::Right).target, cell(2, "description"));
        assert_eq!(go(&t, &cell(1, "description"), NavKey::Left).target, cell(1, "description"));
    }

    #[test]
    fn test_tab_wraps_to_next_row() {
        let t = table();
        assert_eq!(go(&t, &cell(1, "rate"), NavKey::Tab).target, cell(2, "description"));
        assert_eq!(go(&t, &cell(2, "description"), NavKey::Tab).target, cell(3, "description"));
    }

    #[test]
    fn test_shift_tab_wraps_back_and_stops_at_first_cell() {
        let t = table();
        assert_eq!(go(&t, &cell(3, "description"), NavKey::ShiftTab).target, cell(2, "description"));
        assert_eq!(go(&t, &cell(2, "description"), NavKey::ShiftTab).target, cell(1, "rate"));
        let first = go(&t, &cell(1, "description"), NavKey::ShiftTab);
        assert_eq!(first.target, cell(1, "description"));
        assert!(first.event.is_none());
        assert_eq!(first_cell(&t), Some(cell(1, "description")));
    }

    #[test]
    fn test_enter_on_last_row_appends() {
        let t = table();
        let outcome = go(&t, &cell(3, "rate"), NavKey::Enter);
        let id = t.next_placeholder();
        assert_eq!(outcome.target, CellRef::new(id, "rate"));
        assert_eq!(outcome.event, Some(ChangeEvent::RowAdd { rows: vec![NewRow::new(id)] }));

        let settings = EngineSettings { enter_appends_row: false, ..EngineSettings::default() };
        let stay = next_cell(&t, &cell(3, "rate"), NavKey::Enter, &settings).unwrap();
        assert_eq!(stay.target, cell(3, "rate"));
        assert!(stay.event.is_none());
    }

    #[test]
    fn test_tab_past_end_appends() {
        let t = table();
        let outcome = go(&t, &cell(3, "rate"), NavKey::Tab);
        assert_eq!(outcome.target, CellRef::new(t.next_placeholder(), "description"));
        assert!(outcome.event.is_some());
    }

    #[test]
    fn test_footer_is_not_a_start_cell() {
        let t = table();
        let from = CellRef::new(RowId::Footer, "rate");
        assert!(next_cell(&t, &from, NavKey::Up, &EngineSettings::default()).is_none());
    }
}
