//! Group and footer totals.

use budgetgrid_core::CellValue;

use crate::column::Columns;
use crate::row::{is_data_row, Row, RowData};

/// Sum every aggregable column over the data rows in `rows`.
///
/// Null and non-numeric cells count as zero. Group rows and the footer are
/// ignored so totals are never double counted. Columns that are not
/// aggregable carry their null sentinel.
pub fn sum_rows<'a>(columns: &Columns, rows: impl IntoIterator<Item = &'a Row>) -> RowData {
    let rows: Vec<&Row> = rows.into_iter().filter(|r| is_data_row(r)).collect();
    columns
        .iter()
        .map(|column| {
            let value = if column.aggregable {
                let total: f64 = rows
                    .iter()
                    .filter_map(|r| r.value(column.field.as_str()).and_then(CellValue::as_number))
                    .sum();
                CellValue::Number(total)
            } else {
                column.null_value.clone()
            };
            (column.field.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::row::create_placeholder_row;
    use budgetgrid_core::{ColumnKind, FieldKey, PlaceholderId};

    #[test]
    fn test_sum_treats_null_as_zero() {
        let columns = Columns::new(vec![
            Column::new("name", ColumnKind::Text),
            Column::new("estimated", ColumnKind::Currency).aggregable(),
            Column::new("rate", ColumnKind::Number),
        ]);
        let a = create_placeholder_row(&columns, PlaceholderId(1), vec![(FieldKey::from("estimated"), CellValue::Number(10.0))]);
        let b = create_placeholder_row(&columns, PlaceholderId(2), Vec::new());
        let c = create_placeholder_row(&columns, PlaceholderId(3), vec![(FieldKey::from("estimated"), CellValue::Number(2.5))]);

        let totals = sum_rows(&columns, [&a, &b, &c]);
        assert_eq!(totals.get("estimated"), Some(&CellValue::Number(12.5)));
        assert_eq!(totals.get("rate"), Some(&CellValue::Null));
        assert_eq!(totals.get("name"), Some(&CellValue::text("")));
    }

    #[test]
    fn test_sum_ignores_synthetic_rows() {
        let columns = Columns::new(vec![Column::new("estimated", ColumnKind::Currency).aggregable()]);
        let a = create_placeholder_row(&columns, PlaceholderId(1), vec![(FieldKey::from("estimated"), CellValue::Number(4.0))]);
        let footer = Row::footer(sum_rows(&columns, [&a]));

        let totals = sum_rows(&columns, [&a, &footer]);
        assert_eq!(totals.get("estimated"), Some(&CellValue::Number(4.0)));
        assert_eq!(sum_rows(&columns, std::iter::empty()).get("estimated"), Some(&CellValue::Number(0.0)));
    }
}
