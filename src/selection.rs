use tracing::debug;

use crate::map::PickInfo;

/// The currently selected municipality.
///
/// Owned by [`App`](crate::app::App); views only ever see `current()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<String>,
    /// Bumped once per `select` call
    revision: u64,
}

impl Selection {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            current: initial,
            revision: 0,
        }
    }

    /// Replace the selection. No validation against the attribute table.
    pub fn select(&mut self, identifier: Option<String>) {
        debug!(from = ?self.current, to = ?identifier, "selection changed");
        self.current = identifier;
        self.revision += 1;
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Select the picked feature. A pick that hit nothing leaves the selection alone.
    pub fn apply_pick(&mut self, pick: &PickInfo<'_>) -> bool {
        match pick.object {
            Some(feature) => {
                self.select(Some(feature.name.clone()));
                true
            }
            None => false,
        }
    }
}
