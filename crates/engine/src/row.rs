//! Row variants and the factories that build their projections.
//!
//! Every other module classifies rows through the `is_*_row` predicates or an
//! exhaustive match on `Row`; nothing inspects row shape structurally.

use std::collections::BTreeMap;

use budgetgrid_core::{CellValue, FieldKey, GroupId, ModelId, PlaceholderId, RowId};
use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::column::Columns;
use crate::entity::TableEntity;

/// Projection of a row's fields, keyed by column field.
pub type RowData = BTreeMap<FieldKey, CellValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRow {
    pub id: ModelId,
    pub data: RowData,
    pub children: Vec<ModelId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderRow {
    pub id: PlaceholderId,
    pub data: RowData,
}

/// Persisted metadata of a user-defined group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMeta {
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl GroupMeta {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), color: None }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Derived footer row of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub meta: GroupMeta,
    /// Member rows, in the order they appear in the table.
    pub members: Vec<RowId>,
    /// Aggregates over `members`.
    pub data: RowData,
}

/// Grand totals over every data row.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterRow {
    pub data: RowData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Model(ModelRow),
    Placeholder(PlaceholderRow),
    Group(GroupRow),
    Footer(FooterRow),
}

impl Row {
    pub fn footer(data: RowData) -> Self {
        Row::Footer(FooterRow { data })
    }

    pub fn id(&self) -> RowId {
        match self {
            Row::Model(r) => RowId::Model(r.id),
            Row::Placeholder(r) => RowId::Placeholder(r.id),
            Row::Group(r) => RowId::Group(r.meta.id),
            Row::Footer(_) => RowId::Footer,
        }
    }

    pub fn data(&self) -> &RowData {
        match self {
            Row::Model(r) => &r.data,
            Row::Placeholder(r) => &r.data,
            Row::Group(r) => &r.data,
            Row::Footer(r) => &r.data,
        }
    }

    pub(crate) fn set_data(&mut self, data: RowData) {
        match self {
            Row::Model(r) => r.data = data,
            Row::Placeholder(r) => r.data = data,
            Row::Group(r) => r.data = data,
            Row::Footer(r) => r.data = data,
        }
    }

    pub fn value(&self, field: &str) -> Option<&CellValue> {
        self.data().get(field)
    }

    /// Child row ids; only model rows have children.
    pub fn children(&self) -> &[ModelId] {
        match self {
            Row::Model(r) => &r.children,
            _ => &[],
        }
    }

    pub fn as_group(&self) -> Option<&GroupRow> {
        match self {
            Row::Group(g) => Some(g),
            _ => None,
        }
    }

    pub(crate) fn as_group_mut(&mut self) -> Option<&mut GroupRow> {
        match self {
            Row::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn is_data_row(&self) -> bool {
        is_data_row(self)
    }
}

pub fn is_model_row(row: &Row) -> bool {
    matches!(row, Row::Model(_))
}

pub fn is_placeholder_row(row: &Row) -> bool {
    matches!(row, Row::Placeholder(_))
}

pub fn is_group_row(row: &Row) -> bool {
    matches!(row, Row::Group(_))
}

pub fn is_footer_row(row: &Row) -> bool {
    matches!(row, Row::Footer(_))
}

/// Model and placeholder rows: the rows users edit and navigate.
pub fn is_data_row(row: &Row) -> bool {
    is_model_row(row) || is_placeholder_row(row)
}

/// Project an entity onto `columns`. Fields the entity lacks get the
/// column's null sentinel.
pub fn create_model_row(columns: &Columns, entity: &dyn TableEntity) -> Row {
    let data = columns
        .iter()
        .map(|c| {
            let value = entity.field(c.field.as_str()).unwrap_or_else(|| c.null_value.clone());
            (c.field.clone(), value)
        })
        .collect();
    Row::Model(ModelRow { id: entity.id(), data, children: entity.children().to_vec() })
}

/// Build a placeholder row from explicit field values. Unknown fields are
/// dropped, missing ones get the column's null sentinel. Values are stored
/// as given; coercion is the caller's job.
pub fn create_placeholder_row(
    columns: &Columns,
    id: PlaceholderId,
    values: impl IntoIterator<Item = (FieldKey, CellValue)>,
) -> Row {
    let mut data: RowData = columns.iter().map(|c| (c.field.clone(), c.null_value.clone())).collect();
    for (field, value) in values {
        if columns.get(field.as_str()).is_some() {
            data.insert(field, value);
        }
    }
    Row::Placeholder(PlaceholderRow { id, data })
}

/// Build a group row whose aggregates cover `members`.
pub fn create_group_row<'a>(
    columns: &Columns,
    meta: GroupMeta,
    members: impl IntoIterator<Item = &'a Row>,
) -> Row {
    let rows: Vec<&Row> = members.into_iter().filter(|r| is_data_row(r)).collect();
    let data = aggregate::sum_rows(columns, rows.iter().copied());
    Row::Group(GroupRow { meta, members: rows.iter().map(|r| r.id()).collect(), data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::entity::Fringe;
    use budgetgrid_core::ColumnKind;

    fn columns() -> Columns {
        Columns::new(vec![
            Column::new("name", ColumnKind::Text),
            Column::new("rate", ColumnKind::Percentage).aggregable(),
            Column::new("unit", ColumnKind::SingleSelect),
            Column::new("tags", ColumnKind::MultiSelect),
        ])
    }

    #[test]
    fn test_model_row_substitutes_null_sentinels() {
        let fringe = Fringe { id: ModelId(3), rate: Some(0.2), ..Default::default() };
        let row = create_model_row(&columns(), &fringe);

        assert!(is_model_row(&row));
        assert_eq!(row.id(), RowId::Model(ModelId(3)));
        assert_eq!(row.value("name"), Some(&CellValue::text("")));
        assert_eq!(row.value("rate"), Some(&CellValue::Number(0.2)));
        assert_eq!(row.value("unit"), Some(&CellValue::Null));
        assert_eq!(row.value("tags"), Some(&CellValue::RefList(vec![])));
    }

    #[test]
    fn test_placeholder_row_drops_unknown_fields() {
        let row = create_placeholder_row(
            &columns(),
            PlaceholderId(1),
            vec![
                (FieldKey::from("name"), CellValue::text("Payroll")),
                (FieldKey::from("bogus"), CellValue::Number(1.0)),
            ],
        );
        assert!(is_placeholder_row(&row));
        assert_eq!(row.value("name"), Some(&CellValue::text("Payroll")));
        assert_eq!(row.value("bogus"), None);
        assert_eq!(row.data().len(), 4);
    }

    #[test]
    fn test_group_row_aggregates_members() {
        let cols = columns();
        let a = create_placeholder_row(&cols, PlaceholderId(1), vec![(FieldKey::from("rate"), CellValue::Number(0.1))]);
        let b = create_placeholder_row(&cols, PlaceholderId(2), vec![(FieldKey::from("rate"), CellValue::Number(0.3))]);
        let footer = Row::footer(RowData::new());

        let group = create_group_row(&cols, GroupMeta::new(GroupId(9), "Crew"), [&a, &b, &footer]);
        assert!(is_group_row(&group));
        let g = group.as_group().unwrap();
        assert_eq!(g.members, vec![a.id(), b.id()]);
        let total = group.value("rate").and_then(|v| v.as_number()).unwrap();
        assert!((total - 0.4).abs() < 1e-9);
        assert_eq!(group.value("name"), Some(&CellValue::text("")));
    }

    #[test]
    fn test_predicates() {
        let footer = Row::footer(RowData::new());
        assert!(is_footer_row(&footer));
        assert!(!is_data_row(&footer));
        assert_eq!(footer.id(), RowId::Footer);
        assert!(footer.children().is_empty());
    }
}
