//! Notifications emitted by a table session.
//!
//! The grid adapter listens to these to repaint; tests use `EventCollector`
//! to check ordering and revision boundaries.

use std::sync::{Arc, Mutex};

use budgetgrid_core::CellRef;

#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    /// An event was applied (fully, partially, or not at all).
    Applied(AppliedEvent),

    /// Cells whose value changed, tagged with the revision that changed them.
    CellsChanged(CellsChangedEvent),

    /// Emitted exactly once per event that changed the table.
    RevisionChanged(RevisionChangedEvent),

    /// Rows were added, removed, regrouped or reordered.
    DisplayOrderChanged { revision: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedEvent {
    /// Change event kind (`dataChange`, `rowAdd`, ...).
    pub kind: &'static str,
    /// Revision after this event (unchanged when nothing applied).
    pub revision: u64,
    /// Items applied.
    pub applied: usize,
    /// Items in the event.
    pub total: usize,
    /// Diagnostic codes raised while applying.
    pub diagnostics: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellsChangedEvent {
    /// All cells in this event belong to this single revision.
    pub revision: u64,
    pub cells: Vec<CellRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevisionChangedEvent {
    pub revision: u64,
    pub previous: u64,
}

impl TableEvent {
    /// Revision the notification belongs to.
    pub fn revision(&self) -> u64 {
        match self {
            TableEvent::Applied(e) => e.revision,
            TableEvent::CellsChanged(e) => e.revision,
            TableEvent::RevisionChanged(e) => e.revision,
            TableEvent::DisplayOrderChanged { revision } => *revision,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TableEvent::Applied(_) => "applied",
            TableEvent::CellsChanged(_) => "cellsChanged",
            TableEvent::RevisionChanged(_) => "revisionChanged",
            TableEvent::DisplayOrderChanged { .. } => "displayOrderChanged",
        }
    }
}

pub type EventCallback = Box<dyn FnMut(TableEvent) + Send>;

/// Records notifications in arrival order.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<TableEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector behind a mutex plus a callback feeding it, ready for
    /// `TableSession::with_callback`.
    pub fn shared() -> (Arc<Mutex<Self>>, EventCallback) {
        let collector = Arc::new(Mutex::new(Self::new()));
        let sink = Arc::clone(&collector);
        let callback: EventCallback = Box::new(move |event: TableEvent| {
            if let Ok(mut c) = sink.lock() {
                c.push(event);
            }
        });
        (collector, callback)
    }

    pub fn push(&mut self, event: TableEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TableEvent] {
        &self.events
    }

    /// Drain everything recorded so far.
    pub fn take(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }

    /// Notification names in arrival order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(TableEvent::name).collect()
    }

    pub fn applied(&self) -> Vec<&AppliedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TableEvent::Applied(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    /// Every repainted cell across all `CellsChanged` notifications.
    pub fn changed_cells(&self) -> Vec<&CellRef> {
        self.events
            .iter()
            .flat_map(|e| match e {
                TableEvent::CellsChanged(c) => c.cells.as_slice(),
                _ => &[][..],
            })
            .collect()
    }

    /// `(previous, revision)` pairs.
    pub fn revision_changes(&self) -> Vec<(u64, u64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TableEvent::RevisionChanged(r) => Some((r.previous, r.revision)),
                _ => None,
            })
            .collect()
    }

    /// Revisions at which the display order changed.
    pub fn display_changes(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TableEvent::DisplayOrderChanged { revision } => Some(*revision),
                _ => None,
            })
            .collect()
    }

    pub fn at_revision(&self, revision: u64) -> Vec<&TableEvent> {
        self.events.iter().filter(|e| e.revision() == revision).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetgrid_core::ModelId;

    fn applied(revision: u64) -> TableEvent {
        TableEvent::Applied(AppliedEvent { kind: "rowAdd", revision, applied: 1, total: 1, diagnostics: Vec::new() })
    }

    #[test]
    fn test_accessors_split_by_notification() {
        let (shared, mut callback) = EventCollector::shared();
        callback(TableEvent::RevisionChanged(RevisionChangedEvent { revision: 4, previous: 3 }));
        callback(TableEvent::CellsChanged(CellsChangedEvent {
            revision: 4,
            cells: vec![CellRef::new(ModelId(1), "rate"), CellRef::new(ModelId(2), "rate")],
        }));
        callback(TableEvent::DisplayOrderChanged { revision: 4 });
        callback(applied(4));
        callback(applied(4));

        let mut c = shared.lock().unwrap();
        assert_eq!(
            c.names(),
            vec!["revisionChanged", "cellsChanged", "displayOrderChanged", "applied", "applied"]
        );
        assert_eq!(c.changed_cells().len(), 2);
        assert_eq!(c.revision_changes(), vec![(3, 4)]);
        assert_eq!(c.display_changes(), vec![4]);
        assert_eq!(c.applied().len(), 2);
        assert_eq!(c.at_revision(4).len(), 5);
        assert!(c.at_revision(3).is_empty());

        assert_eq!(c.take().len(), 5);
        assert!(c.events().is_empty());
    }
}
