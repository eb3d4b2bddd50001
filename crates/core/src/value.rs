use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used for display and clipboard text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    #[default]
    Text,
    LongText,
    Number,
    Currency,
    Percentage,
    Date,
    SingleSelect,
    /// Several references in one cell (tags).
    MultiSelect,
    Contact,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Number | ColumnKind::Currency | ColumnKind::Percentage)
    }

    /// Kinds whose cells hold ids resolved against a lookup.
    pub fn is_reference(&self) -> bool {
        matches!(self, ColumnKind::SingleSelect | ColumnKind::MultiSelect | ColumnKind::Contact)
    }

    /// Null sentinel used when a column does not declare its own.
    ///
    /// Matches what the server stores for "no value" of each kind:
    /// an empty string for text, an empty list for tags, null otherwise.
    pub fn default_null(&self) -> CellValue {
        match self {
            ColumnKind::Text | ColumnKind::LongText => CellValue::Text(String::new()),
            ColumnKind::MultiSelect => CellValue::RefList(Vec::new()),
            ColumnKind::Number
            | ColumnKind::Currency
            | ColumnKind::Percentage
            | ColumnKind::Date
            | ColumnKind::SingleSelect
            | ColumnKind::Contact => CellValue::Null,
        }
    }
}

/// Whether a column holds data or is a gutter control (select, expand,
/// delete). Action columns are never editable, pasted into, or navigated to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    #[default]
    Data,
    Action,
}

/// Value stored in a cell.
///
/// `Null` is a concrete sentinel a column may declare, not "absent". Absent
/// input is represented as `Option::None` at the edges and normalized to the
/// column's sentinel before it reaches a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    /// Id of a referenced choice or contact.
    Ref(u64),
    /// Ids of several referenced choices, in display order.
    RefList(Vec<u64>),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric content, if any. Text is not parsed here; coercion belongs to
    /// the column registry.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Referenced ids held by this cell (empty for non-reference values).
    pub fn refs(&self) -> Vec<u64> {
        match self {
            CellValue::Ref(id) => vec![*id],
            CellValue::RefList(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Format a number without trailing zeros; integral values drop the
    /// fraction entirely.
    pub fn format_number(n: f64) -> String {
        if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            format!("{}", n)
        }
    }

    /// Default stringification used when a column has no clipboard encoder.
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => Self::format_number(*n),
            CellValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            CellValue::Ref(id) => id.to_string(),
            CellValue::RefList(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_null_per_kind() {
        assert_eq!(ColumnKind::Text.default_null(), CellValue::Text(String::new()));
        assert_eq!(ColumnKind::LongText.default_null(), CellValue::Text(String::new()));
        assert_eq!(ColumnKind::MultiSelect.default_null(), CellValue::RefList(vec![]));
        assert_eq!(ColumnKind::Currency.default_null(), CellValue::Null);
        assert_eq!(ColumnKind::Contact.default_null(), CellValue::Null);
    }

    #[test]
    fn test_raw_display() {
        assert_eq!(CellValue::Number(12.0).raw_display(), "12");
        assert_eq!(CellValue::Number(12.5).raw_display(), "12.5");
        assert_eq!(CellValue::Null.raw_display(), "");
        assert_eq!(CellValue::RefList(vec![1, 2, 3]).raw_display(), "1, 2, 3");
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(CellValue::Date(d).raw_display(), "2024-03-09");
    }

    #[test]
    fn test_as_number_does_not_parse_text() {
        assert_eq!(CellValue::Number(3.0).as_number(), Some(3.0));
        assert_eq!(CellValue::text("3").as_number(), None);
        assert_eq!(CellValue::Null.as_number(), None);
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: ColumnKind = serde_json::from_str("\"singleSelect\"").unwrap();
        assert_eq!(kind, ColumnKind::SingleSelect);
        assert_eq!(serde_json::to_string(&ColumnKind::LongText).unwrap(), "\"longText\"");
    }
}
