//! Row and cell identity.
//!
//! A `RowId` identifies a displayed row regardless of its variant. Each
//! variant wraps its own id type, so a placeholder id can never compare equal
//! to a persisted model id even when the raw numbers match.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Persisted id of a backing entity (account, sub-account, fringe, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub u64);

/// Synthetic id of a row created locally and not yet persisted.
///
/// Minted from a monotonic per-table counter and never reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderId(pub u64);

/// Persisted id of a user-defined group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl ModelId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl PlaceholderId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// The id minted after this one, or `None` once the id space is used up.
    #[inline]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(PlaceholderId)
    }
}

impl GroupId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Identity of any displayed row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum RowId {
    Model(ModelId),
    Placeholder(PlaceholderId),
    Group(GroupId),
    /// The singleton table footer.
    Footer,
}

impl RowId {
    /// Rows that hold user data (model and placeholder rows).
    pub fn is_data(&self) -> bool {
        matches!(self, RowId::Model(_) | RowId::Placeholder(_))
    }

    /// Rows derived by the engine (group rows and the footer).
    pub fn is_synthetic(&self) -> bool {
        !self.is_data()
    }
}

impl From<ModelId> for RowId {
    fn from(id: ModelId) -> Self {
        RowId::Model(id)
    }
}

impl From<PlaceholderId> for RowId {
    fn from(id: PlaceholderId) -> Self {
        RowId::Placeholder(id)
    }
}

impl From<GroupId> for RowId {
    fn from(id: GroupId) -> Self {
        RowId::Group(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Model(id) => write!(f, "{}", id.0),
            RowId::Placeholder(id) => write!(f, "placeholder-{}", id.0),
            RowId::Group(id) => write!(f, "group-{}", id.0),
            RowId::Footer => write!(f, "footer"),
        }
    }
}

/// Key of a column's field in a row's projection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn new(field: impl Into<String>) -> Self {
        FieldKey(field.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(s: &str) -> Self {
        FieldKey(s.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(s: String) -> Self {
        FieldKey(s)
    }
}

impl std::borrow::Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cell: a row plus a column field.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: RowId,
    pub field: FieldKey,
}

impl CellRef {
    #[inline]
    pub fn new(row: impl Into<RowId>, field: impl Into<FieldKey>) -> Self {
        Self { row: row.into(), field: field.into() }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.row, self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_placeholder_never_equals_model() {
        let model = RowId::Model(ModelId(7));
        let placeholder = RowId::Placeholder(PlaceholderId(7));
        assert_ne!(model, placeholder);

        let mut set = HashSet::new();
        set.insert(model);
        set.insert(placeholder);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_row_id_classification() {
        assert!(RowId::Model(ModelId(1)).is_data());
        assert!(RowId::Placeholder(PlaceholderId(1)).is_data());
        assert!(RowId::Group(GroupId(1)).is_synthetic());
        assert!(RowId::Footer.is_synthetic());
    }

    #[test]
    fn test_display() {
        assert_eq!(RowId::Model(ModelId(42)).to_string(), "42");
        assert_eq!(RowId::Placeholder(PlaceholderId(3)).to_string(), "placeholder-3");
        assert_eq!(RowId::Group(GroupId(5)).to_string(), "group-5");
        assert_eq!(CellRef::new(ModelId(1), "rate").to_string(), "1!rate");
    }

    #[test]
    fn test_row_id_serde_shape() {
        let json = serde_json::to_string(&RowId::Placeholder(PlaceholderId(2))).unwrap();
        assert_eq!(json, r#"{"kind":"placeholder","id":2}"#);
        let back: RowId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RowId::Placeholder(PlaceholderId(2)));

        let footer: RowId = serde_json::from_str(r#"{"kind":"footer"}"#).unwrap();
        assert_eq!(footer, RowId::Footer);
    }
}
