//! Layer selection panels.
//!
//! The primary switcher is a panel with a tip button. If it ever renders
//! without group entries, [`FallbackProbe`] swaps it for a [`CheckboxTree`]
//! built from the same groups.

mod panel;
mod probe;
mod tree;

pub use panel::{ActivationMode, PrimarySwitcher, SwitcherMode, SwitcherOptions};
pub use probe::{FallbackProbe, ProbeOutcome};
pub use tree::CheckboxTree;

use crate::layers::{Group, GroupNode, LayerId, MapModel};
use crate::visibility::VisibilityCoordinator;

/// Label of the button that brings a closed checkbox tree back
pub const REOPEN_LABEL: &str = "☰ Layers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Group header, never selectable
    Group,
    Layer {
        id: LayerId,
        checked: bool,
        /// Base layers are radio buttons in the primary panel
        radio: bool,
    },
}

/// One line of a switcher panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitcherRow {
    pub depth: usize,
    pub label: String,
    pub kind: RowKind,
}

impl SwitcherRow {
    pub fn layer(&self) -> Option<LayerId> {
        match self.kind {
            RowKind::Layer { id, .. } => Some(id),
            RowKind::Group => None,
        }
    }
}

/// What a switcher drew on its last render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderReport {
    pub group_entries: usize,
    pub leaf_entries: usize,
}

impl RenderReport {
    pub fn of_rows(rows: &[SwitcherRow]) -> Self {
        rows.iter().fold(Self::default(), |mut report, row| {
            match row.kind {
                RowKind::Group => report.group_entries += 1,
                RowKind::Layer { .. } => report.leaf_entries += 1,
            }
            report
        })
    }

    /// Leaves were drawn but none of the group structure
    pub fn is_flat(&self) -> bool {
        self.leaf_entries > 0 && self.group_entries == 0
    }
}

/// Whichever switcher is currently installed
#[derive(Debug, Clone)]
pub enum Switcher {
    Primary(PrimarySwitcher),
    Fallback(CheckboxTree),
}

impl Switcher {
    pub fn is_open(&self) -> bool {
        match self {
            Switcher::Primary(panel) => panel.is_active(),
            Switcher::Fallback(tree) => tree.is_open(),
        }
    }

    pub fn open(&mut self) {
        match self {
            Switcher::Primary(panel) => panel.activate(),
            Switcher::Fallback(tree) => tree.reopen(),
        }
    }

    pub fn close(&mut self) {
        match self {
            Switcher::Primary(panel) => panel.deactivate(),
            Switcher::Fallback(tree) => tree.close(),
        }
    }

    pub fn toggle_open(&mut self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// Rows to draw this frame, empty while closed
    pub fn rows(&mut self, model: &MapModel, state: &VisibilityCoordinator) -> Vec<SwitcherRow> {
        match self {
            Switcher::Primary(panel) => panel.render(model, state),
            Switcher::Fallback(tree) => tree.render(model, state),
        }
    }

    /// Panel title, or the label of the button shown while closed
    pub fn label(&self) -> &str {
        match self {
            Switcher::Primary(panel) => panel.options().tip_label.as_str(),
            Switcher::Fallback(tree) if tree.is_open() => tree::TITLE,
            Switcher::Fallback(_) => REOPEN_LABEL,
        }
    }

    /// Visibility a click on `row` asks for, if any
    pub fn click(&self, row: &SwitcherRow) -> Option<(LayerId, bool)> {
        match (self, row.kind) {
            (_, RowKind::Group) => None,
            // Radio buttons only ever select
            (Switcher::Primary(_), RowKind::Layer { id, radio: true, .. }) => Some((id, true)),
            (_, RowKind::Layer { id, checked, .. }) => Some((id, !checked)),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Switcher::Fallback(_))
    }
}

/// Header plus indented leaves for `group` and everything nested in it
pub(crate) fn nested_rows(
    group: &Group,
    depth: usize,
    model: &MapModel,
    state: &VisibilityCoordinator,
    radio_base: bool,
    rows: &mut Vec<SwitcherRow>,
) {
    rows.push(SwitcherRow {
        depth,
        label: group.title.clone(),
        kind: RowKind::Group,
    });
    for member in &group.members {
        match member {
            GroupNode::Layer(id) => {
                if let Some(row) = layer_row(*id, depth + 1, model, state, radio_base) {
                    rows.push(row);
                }
            }
            GroupNode::Group(nested) => {
                nested_rows(nested, depth + 1, model, state, radio_base, rows)
            }
        }
    }
}

pub(crate) fn layer_row(
    id: LayerId,
    depth: usize,
    model: &MapModel,
    state: &VisibilityCoordinator,
    radio_base: bool,
) -> Option<SwitcherRow> {
    let layer = model.layer(id)?;
    Some(SwitcherRow {
        depth,
        label: layer.title.clone(),
        kind: RowKind::Layer {
            id,
            checked: state.is_visible(id),
            radio: radio_base && layer.base,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: RowKind) -> SwitcherRow {
        SwitcherRow {
            depth: 0,
            label: String::new(),
            kind,
        }
    }

    #[test]
    fn test_report_counts_entries() {
        let leaf = RowKind::Layer {
            id: LayerId(0),
            checked: false,
            radio: false,
        };
        let rows = vec![row(RowKind::Group), row(leaf), row(leaf)];
        let report = RenderReport::of_rows(&rows);
        assert_eq!(
            report,
            RenderReport {
                group_entries: 1,
                leaf_entries: 2
            }
        );
        assert!(!report.is_flat());
        assert!(RenderReport::of_rows(&rows[1..]).is_flat());
        assert!(!RenderReport::default().is_flat());
    }

    #[test]
    fn test_radio_rows_only_select() {
        let switcher = Switcher::Primary(PrimarySwitcher::new(SwitcherOptions::default()));
        let radio = row(RowKind::Layer {
            id: LayerId(0),
            checked: true,
            radio: true,
        });
        assert_eq!(switcher.click(&radio), Some((LayerId(0), true)));
        assert_eq!(switcher.click(&row(RowKind::Group)), None);

        let tree = Switcher::Fallback(CheckboxTree::new());
        assert_eq!(tree.click(&radio), Some((LayerId(0), false)));
    }
}
