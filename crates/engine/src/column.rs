//! Column registry.
//!
//! A column is plain configuration. Behavior (editability predicate, value
//! setter, clipboard codecs, reference lookup) hangs off optional function
//! fields; there is no column trait or hierarchy.
//!
//! Two rules live here and nowhere else:
//! - `is_editable` is false for group rows, the footer and action columns.
//! - absent raw input is normalized to the column's null sentinel before any
//!   setter runs.

use std::fmt;
use std::sync::Arc;

use budgetgrid_config::{ColumnSpec, EngineSettings};
use budgetgrid_core::{CellValue, ColumnKind, ColumnRole, FieldKey};
use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::lookup::Lookup;
use crate::row::{Row, RowData};

pub type EditablePredicate = Arc<dyn Fn(&Row) -> bool + Send + Sync>;
pub type ValueSetter = Arc<dyn Fn(&CellValue) -> Result<CellValue, SetError> + Send + Sync>;
pub type ClipboardEncoder = Arc<dyn Fn(&CellValue) -> Result<String, EncodeError> + Send + Sync>;
pub type ClipboardDecoder = Arc<dyn Fn(&str) -> Result<CellValue, DecodeError> + Send + Sync>;

/// Default separator between labels of a multi-value cell.
pub const DEFAULT_LIST_SEPARATOR: char = ',';

// ============================================================================
// Errors
// ============================================================================

/// Why a column declined a write.
#[derive(Debug, Clone, PartialEq)]
pub enum SetError {
    InvalidNumber(String),
    InvalidDate(String),
    InvalidReference(String),
    /// Value variant cannot be stored in a column of this kind.
    TypeMismatch { kind: ColumnKind, found: &'static str },
    /// Rejected by a column-specific setter.
    Custom(String),
}

impl fmt::Display for SetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumber(s) => write!(f, "'{s}' is not a number"),
            Self::InvalidDate(s) => write!(f, "'{s}' is not a date"),
            Self::InvalidReference(s) => write!(f, "'{s}' is not a valid reference"),
            Self::TypeMismatch { kind, found } => write!(f, "cannot store {found} in a {kind:?} column"),
            Self::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SetError {}

/// Clipboard encoding failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The cell references an id the column's lookup no longer knows.
    UnresolvedReference(u64),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference(id) => write!(f, "reference {id} has no label"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Clipboard decoding failure.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    Unparseable { kind: ColumnKind, text: String },
    UnknownLabel(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparseable { kind, text } => write!(f, "cannot read '{text}' as {kind:?}"),
            Self::UnknownLabel(label) => write!(f, "no choice labelled '{label}'"),
        }
    }
}

impl std::error::Error for DecodeError {}

// ============================================================================
// Column
// ============================================================================

/// Static or row-dependent editability.
#[derive(Clone)]
pub enum Editable {
    Always,
    Never,
    When(EditablePredicate),
}

impl fmt::Debug for Editable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Editable::Always => f.write_str("Always"),
            Editable::Never => f.write_str("Never"),
            Editable::When(_) => f.write_str("When(<predicate>)"),
        }
    }
}

#[derive(Clone)]
pub struct Column {
    pub field: FieldKey,
    pub header: String,
    pub kind: ColumnKind,
    pub role: ColumnRole,
    pub editable: Editable,
    /// Value written for "no value". Never `None`-like; see module docs.
    pub null_value: CellValue,
    pub aggregable: bool,
    pub hidden: bool,
    pub list_separator: char,
    pub value_setter: Option<ValueSetter>,
    pub clipboard_encode: Option<ClipboardEncoder>,
    pub clipboard_decode: Option<ClipboardDecoder>,
    pub lookup: Option<Arc<Lookup>>,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("field", &self.field)
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("editable", &self.editable)
            .field("null_value", &self.null_value)
            .field("aggregable", &self.aggregable)
            .field("hidden", &self.hidden)
            .field("value_setter", &self.value_setter.is_some())
            .field("clipboard_encode", &self.clipboard_encode.is_some())
            .field("clipboard_decode", &self.clipboard_decode.is_some())
            .field("lookup", &self.lookup.as_ref().map(|l| l.len()))
            .finish()
    }
}

impl Column {
    pub fn new(field: impl Into<FieldKey>, kind: ColumnKind) -> Self {
        let field = field.into();
        Self {
            header: field.to_string(),
            field,
            kind,
            role: ColumnRole::Data,
            editable: Editable::Always,
            null_value: kind.default_null(),
            aggregable: false,
            hidden: false,
            list_separator: DEFAULT_LIST_SEPARATOR,
            value_setter: None,
            clipboard_encode: None,
            clipboard_decode: None,
            lookup: None,
        }
    }

    /// Gutter column (select checkbox, expand arrow, delete button).
    pub fn action(field: impl Into<FieldKey>) -> Self {
        Self { role: ColumnRole::Action, editable: Editable::Never, ..Self::new(field, ColumnKind::Text) }
    }

    /// Build a column from its declarative spec.
    pub fn from_spec(spec: &ColumnSpec) -> Self {
        let mut column = Self::new(spec.field.as_str(), spec.column_kind);
        column.header = spec.effective_header().to_string();
        column.role = spec.role;
        column.editable = if spec.editable && spec.role == ColumnRole::Data {
            Editable::Always
        } else {
            Editable::Never
        };
        if let Some(null_value) = &spec.null_value {
            column.null_value = null_value.clone();
        }
        column.aggregable = spec.aggregable;
        column.hidden = spec.hidden;
        column
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = Editable::Never;
        self
    }

    pub fn editable_when(mut self, predicate: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        self.editable = Editable::When(Arc::new(predicate));
        self
    }

    pub fn with_null_value(mut self, value: CellValue) -> Self {
        self.null_value = value;
        self
    }

    pub fn aggregable(mut self) -> Self {
        self.aggregable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_list_separator(mut self, separator: char) -> Self {
        self.list_separator = separator;
        self
    }

    pub fn with_setter(
        mut self,
        setter: impl Fn(&CellValue) -> Result<CellValue, SetError> + Send + Sync + 'static,
    ) -> Self {
        self.value_setter = Some(Arc::new(setter));
        self
    }

    pub fn with_clipboard_encode(
        mut self,
        encode: impl Fn(&CellValue) -> Result<String, EncodeError> + Send + Sync + 'static,
    ) -> Self {
        self.clipboard_encode = Some(Arc::new(encode));
        self
    }

    pub fn with_clipboard_decode(
        mut self,
        decode: impl Fn(&str) -> Result<CellValue, DecodeError> + Send + Sync + 'static,
    ) -> Self {
        self.clipboard_decode = Some(Arc::new(decode));
        self
    }

    /// Resolve reference ids to labels (and back) on the clipboard.
    pub fn with_lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    pub fn is_action(&self) -> bool {
        self.role == ColumnRole::Action
    }

    /// Shown in the grid and addressable by selections and paste.
    pub fn is_grid_column(&self) -> bool {
        !self.hidden && !self.is_action()
    }

    /// Replace absent input with this column's null sentinel.
    pub fn normalize(&self, raw: Option<CellValue>) -> CellValue {
        raw.unwrap_or_else(|| self.null_value.clone())
    }

    /// Coerce a value to what this column stores, without touching any row.
    ///
    /// A custom setter takes precedence over the kind's default coercion.
    /// Results that mean "no value" come back as the null sentinel.
    pub fn coerce(&self, raw: Option<CellValue>) -> Result<CellValue, SetError> {
        let value = self.normalize(raw);
        if value == self.null_value {
            return Ok(value);
        }
        if let Some(setter) = &self.value_setter {
            return setter(&value);
        }
        Ok(coerce_for_kind(self.kind, value, self.list_separator)?
            .unwrap_or_else(|| self.null_value.clone()))
    }

    /// Parse editor or clipboard text with this column's kind rules,
    /// bypassing any custom setter.
    pub fn parse_text(&self, text: &str) -> Result<CellValue, SetError> {
        Ok(coerce_for_kind(self.kind, CellValue::Text(text.to_string()), self.list_separator)?
            .unwrap_or_else(|| self.null_value.clone()))
    }
}

/// Whether `column` accepts user edits on `row`.
pub fn is_editable(row: &Row, column: &Column) -> bool {
    if !row.is_data_row() || column.is_action() {
        return false;
    }
    match &column.editable {
        Editable::Always => true,
        Editable::Never => false,
        Editable::When(predicate) => predicate(row),
    }
}

/// Write `raw` into `column` of `row`, returning the updated projection.
///
/// On rejection the row is untouched. Editability is the caller's check.
pub fn set_value(row: &Row, column: &Column, raw: Option<CellValue>) -> Result<RowData, SetError> {
    let stored = column.coerce(raw)?;
    let mut data = row.data().clone();
    data.insert(column.field.clone(), stored);
    Ok(data)
}

// ============================================================================
// Default coercion
// ============================================================================

fn variant_name(value: &CellValue) -> &'static str {
    match value {
        CellValue::Null => "null",
        CellValue::Text(_) => "text",
        CellValue::Number(_) => "number",
        CellValue::Date(_) => "date",
        CellValue::Ref(_) => "reference",
        CellValue::RefList(_) => "reference list",
    }
}

/// `Ok(None)` means the input amounts to "no value".
fn coerce_for_kind(kind: ColumnKind, value: CellValue, separator: char) -> Result<Option<CellValue>, SetError> {
    let mismatch = |value: &CellValue| SetError::TypeMismatch { kind, found: variant_name(value) };

    if value.is_null() {
        return Ok(None);
    }

    match kind {
        ColumnKind::Text | ColumnKind::LongText => match value {
            CellValue::Text(s) => Ok(Some(CellValue::Text(s))),
            CellValue::Number(_) | CellValue::Date(_) => Ok(Some(CellValue::Text(value.raw_display()))),
            other => Err(mismatch(&other)),
        },
        ColumnKind::Number | ColumnKind::Currency | ColumnKind::Percentage => match value {
            CellValue::Number(n) if n.is_finite() => Ok(Some(CellValue::Number(n))),
            CellValue::Number(n) => Err(SetError::InvalidNumber(n.to_string())),
            CellValue::Text(s) if s.trim().is_empty() => Ok(None),
            CellValue::Text(s) => parse_number(&s, kind)
                .map(|n| Some(CellValue::Number(n)))
                .ok_or(SetError::InvalidNumber(s)),
            other => Err(mismatch(&other)),
        },
        ColumnKind::Date => match value {
            CellValue::Date(d) => Ok(Some(CellValue::Date(d))),
            CellValue::Text(s) if s.trim().is_empty() => Ok(None),
            CellValue::Text(s) => parse_date(&s)
                .map(|d| Some(CellValue::Date(d)))
                .ok_or(SetError::InvalidDate(s)),
            other => Err(mismatch(&other)),
        },
        ColumnKind::SingleSelect | ColumnKind::Contact => match value {
            CellValue::Ref(id) => Ok(Some(CellValue::Ref(id))),
            CellValue::RefList(ids) => match ids.as_slice() {
                [] => Ok(None),
                [id] => Ok(Some(CellValue::Ref(*id))),
                _ => Err(SetError::InvalidReference(CellValue::RefList(ids).raw_display())),
            },
            CellValue::Text(s) if s.trim().is_empty() => Ok(None),
            CellValue::Text(s) => s
                .trim()
                .parse::<u64>()
                .map(|id| Some(CellValue::Ref(id)))
                .map_err(|_| SetError::InvalidReference(s)),
            other => Err(mismatch(&other)),
        },
        ColumnKind::MultiSelect => match value {
            CellValue::RefList(ids) => Ok(Some(CellValue::RefList(ids))),
            CellValue::Ref(id) => Ok(Some(CellValue::RefList(vec![id]))),
            CellValue::Text(s) => parse_id_list(&s, separator)
                .map(|ids| Some(CellValue::RefList(ids)))
                .ok_or(SetError::InvalidReference(s)),
            other => Err(mismatch(&other)),
        },
    }
}

/// Parse user-entered numeric text.
///
/// Accepts thousands separators and a leading currency symbol. Percentage
/// columns store fractions, so a trailing `%` divides by 100.
pub fn parse_number(text: &str, kind: ColumnKind) -> Option<f64> {
    let mut s: String = text.trim().chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    let negative = s.starts_with('-');
    if negative {
        s.remove(0);
    }
    if let Some(rest) = s.strip_prefix('$') {
        s = rest.to_string();
    }
    let percent = s.ends_with('%');
    if percent {
        s.pop();
    }
    let mut n: f64 = s.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    if percent {
        if kind != ColumnKind::Percentage {
            return None;
        }
        n /= 100.0;
    }
    Some(if negative { -n } else { n })
}

/// Parse a date in ISO (`2024-03-09`) or US (`03/09/2024`) form.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

/// Split a list cell on `separator`, trimming optional whitespace.
pub fn split_list(text: &str, separator: char) -> Vec<&str> {
    text.split(separator).map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Join list items with `separator` plus one space.
pub fn join_list<S: AsRef<str>>(items: &[S], separator: char) -> String {
    let glue = format!("{separator} ");
    items.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(&glue)
}

fn parse_id_list(text: &str, separator: char) -> Option<Vec<u64>> {
    split_list(text, separator).into_iter().map(|s| s.parse().ok()).collect()
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered column registry with lookup by field.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    columns: Vec<Column>,
    index: FxHashMap<FieldKey, usize>,
}

impl Columns {
    /// Build a registry. A repeated field keeps its first definition.
    pub fn new(columns: Vec<Column>) -> Self {
        let mut kept = Vec::with_capacity(columns.len());
        let mut index = FxHashMap::default();
        for column in columns {
            if index.contains_key(&column.field) {
                log::warn!("duplicate column field '{}' ignored", column.field);
                continue;
            }
            index.insert(column.field.clone(), kept.len());
            kept.push(column);
        }
        Self { columns: kept, index }
    }

    /// Build from declarative specs, applying the configured list separator.
    pub fn from_specs(specs: &[ColumnSpec], settings: &EngineSettings) -> Self {
        Self::new(
            specs
                .iter()
                .map(|spec| Column::from_spec(spec).with_list_separator(settings.list_separator))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&Column> {
        self.index.get(field).map(|&i| &self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns addressable in the grid, left to right.
    pub fn grid_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_grid_column()).collect()
    }

    /// Position of `field` among the grid columns.
    pub fn grid_position(&self, field: &str) -> Option<usize> {
        self.grid_columns().iter().position(|c| c.field.as_str() == field)
    }

    pub fn aggregable(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.aggregable)
    }
}
