use crate::layers::MapModel;
use crate::visibility::VisibilityCoordinator;

use super::{nested_rows, SwitcherRow};

pub(crate) const TITLE: &str = "Layers";

/// Minimal replacement switcher: group headers and one checkbox per layer.
///
/// Checkboxes only mirror coordinator state; toggling one goes back through
/// the coordinator, so siblings uncheck themselves on the next render.
#[derive(Debug, Clone)]
pub struct CheckboxTree {
    open: bool,
}

impl CheckboxTree {
    /// Installed open, so the user sees it replace the panel
    pub fn new() -> Self {
        Self { open: true }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn reopen(&mut self) {
        self.open = true;
    }

    pub fn render(&self, model: &MapModel, state: &VisibilityCoordinator) -> Vec<SwitcherRow> {
        let mut rows = Vec::new();
        if self.open {
            for group in model.groups() {
                nested_rows(group, 0, model, state, false, &mut rows);
            }
        }
        rows
    }
}

impl Default for CheckboxTree {
    fn default() -> Self {
        Self::new()
    }
}
