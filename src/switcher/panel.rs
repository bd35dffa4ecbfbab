use tracing::debug;

use crate::layers::MapModel;
use crate::visibility::VisibilityCoordinator;

use super::{layer_row, nested_rows, RenderReport, SwitcherRow};

/// How the tip button opens the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationMode {
    #[default]
    Click,
    /// Open while the pointer is over the button or panel
    MouseOver,
}

impl std::str::FromStr for ActivationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "click" => Ok(ActivationMode::Click),
            "mouseover" | "mouse_over" => Ok(ActivationMode::MouseOver),
            other => Err(format!("expected 'click' or 'mouseover', got '{other}'")),
        }
    }
}

/// Panel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitcherMode {
    /// Group headers with indented layers
    #[default]
    Nested,
    /// Layers only
    Flat,
}

impl std::str::FromStr for SwitcherMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nested" => Ok(SwitcherMode::Nested),
            "flat" => Ok(SwitcherMode::Flat),
            other => Err(format!("expected 'nested' or 'flat', got '{other}'")),
        }
    }
}

/// Group headers never carry a checkbox; only layers are selectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitcherOptions {
    pub activation_mode: ActivationMode,
    pub start_active: bool,
    pub tip_label: String,
    pub mode: SwitcherMode,
}

impl Default for SwitcherOptions {
    fn default() -> Self {
        Self {
            activation_mode: ActivationMode::Click,
            start_active: false,
            tip_label: "Legenda".to_string(),
            mode: SwitcherMode::Nested,
        }
    }
}

/// The regular layer switcher: a tip button that expands into a panel
#[derive(Debug, Clone)]
pub struct PrimarySwitcher {
    options: SwitcherOptions,
    active: bool,
    last_report: Option<RenderReport>,
}

impl PrimarySwitcher {
    pub fn new(options: SwitcherOptions) -> Self {
        Self {
            active: options.start_active,
            options,
            last_report: None,
        }
    }

    pub fn options(&self) -> &SwitcherOptions {
        &self.options
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Pointer entered or left the tip button
    pub fn hover(&mut self, over: bool) {
        if self.options.activation_mode == ActivationMode::MouseOver {
            self.active = over;
        }
    }

    /// Build the panel entries and publish a [`RenderReport`].
    ///
    /// Entries are built even while inactive so the report exists before
    /// the panel is first opened. Only the active panel returns rows.
    pub fn render(&mut self, model: &MapModel, state: &VisibilityCoordinator) -> Vec<SwitcherRow> {
        let mut rows = Vec::new();
        match self.options.mode {
            SwitcherMode::Nested => {
                for group in model.groups() {
                    nested_rows(group, 0, model, state, true, &mut rows);
                }
            }
            SwitcherMode::Flat => rows.extend(
                model
                    .groups()
                    .iter()
                    .flat_map(|g| g.layer_ids())
                    .filter_map(|id| layer_row(id, 0, model, state, true)),
            ),
        }

        let report = RenderReport::of_rows(&rows);
        if self.last_report != Some(report) {
            debug!(
                groups = report.group_entries,
                leaves = report.leaf_entries,
                "layer switcher rendered"
            );
        }
        self.last_report = Some(report);

        if self.active {
            rows
        } else {
            Vec::new()
        }
    }

    /// Completion signal of the last render, if it has rendered at all
    pub fn last_report(&self) -> Option<RenderReport> {
        self.last_report
    }
}
