//! Id <-> label resolution for reference columns (select, tags, contacts).

use budgetgrid_core::{CellValue, ColumnKind};
use rustc_hash::FxHashMap;

use crate::column::{join_list, split_list, DecodeError, EncodeError};

/// Labels of the choices a reference column may point to.
///
/// Label matching is case-insensitive and ignores surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    labels: FxHashMap<u64, String>,
    ids: FxHashMap<String, u64>,
}

fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}

impl Lookup {
    pub fn new<S: Into<String>>(entries: impl IntoIterator<Item = (u64, S)>) -> Self {
        let mut lookup = Self::default();
        for (id, label) in entries {
            lookup.insert(id, label);
        }
        lookup
    }

    /// Add or relabel a choice.
    pub fn insert(&mut self, id: u64, label: impl Into<String>) {
        let label = label.into();
        if let Some(old) = self.labels.insert(id, label.clone()) {
            self.ids.remove(&label_key(&old));
        }
        self.ids.insert(label_key(&label), id);
    }

    pub fn label(&self, id: u64) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    pub fn id_for(&self, label: &str) -> Option<u64> {
        self.ids.get(&label_key(label)).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Encode a reference cell as labels. Any unknown id fails the whole cell.
    ///
    /// In a list, a label containing `separator` would split on paste, so that
    /// choice is written as its numeric id instead.
    pub fn encode(&self, value: &CellValue, separator: char) -> Result<String, EncodeError> {
        match value {
            CellValue::Ref(id) => self
                .label(*id)
                .map(str::to_string)
                .ok_or(EncodeError::UnresolvedReference(*id)),
            CellValue::RefList(_) => {
                let items = value
                    .refs()
                    .into_iter()
                    .map(|id| match self.label(id) {
                        Some(label) if label.contains(separator) => {
                            log::debug!("label '{label}' contains '{separator}', copying id {id}");
                            Ok(id.to_string())
                        }
                        Some(label) => Ok(label.to_string()),
                        None => Err(EncodeError::UnresolvedReference(id)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(join_list(&items, separator))
            }
            other => Ok(other.raw_display()),
        }
    }

    /// Decode non-empty label text into a reference value for `kind`.
    ///
    /// A token that matches no label but is the id of a known choice resolves
    /// to that id.
    pub fn decode(&self, text: &str, kind: ColumnKind, separator: char) -> Result<CellValue, DecodeError> {
        let resolve = |token: &str| {
            self.id_for(token)
                .or_else(|| token.trim().parse::<u64>().ok().filter(|id| self.labels.contains_key(id)))
                .ok_or_else(|| DecodeError::UnknownLabel(token.trim().to_string()))
        };
        match kind {
            ColumnKind::MultiSelect => split_list(text, separator)
                .into_iter()
                .map(resolve)
                .collect::<Result<Vec<_>, _>>()
                .map(CellValue::RefList),
            _ => resolve(text).map(CellValue::Ref),
        }
    }
}
