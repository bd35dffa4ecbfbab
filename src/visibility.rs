//! Radio-button exclusivity between layers.
//!
//! Every exclusive set keeps an explicit `active` slot. A layer becoming
//! visible takes over the slot of each set it belongs to and hides whoever
//! held it; hiding a layer frees its slots and touches nothing else.
//! [`VisibilityCoordinator::set_visible`] is the only way a flag changes, and
//! it returns the settled list of changes so observers never run while a
//! mutation is in flight.

use tracing::debug;

use crate::error::VisibilityError;
use crate::layers::{Group, LayerId, MapModel};

/// One settled flag flip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub layer: LayerId,
    pub visible: bool,
}

impl VisibilityChange {
    fn shown(layer: LayerId) -> Self {
        Self { layer, visible: true }
    }

    fn hidden(layer: LayerId) -> Self {
        Self {
            layer,
            visible: false,
        }
    }
}

/// Reacts to settled visibility changes. Observers read state, never write it.
pub trait VisibilityObserver {
    fn visibility_changed(&mut self, changes: &[VisibilityChange], state: &VisibilityCoordinator);
}

#[derive(Debug, Clone)]
struct ExclusiveSet {
    members: Vec<LayerId>,
    active: Option<LayerId>,
}

impl ExclusiveSet {
    fn contains(&self, id: LayerId) -> bool {
        self.members.contains(&id)
    }
}

/// Owns the visibility flag of every layer in a [`MapModel`]
#[derive(Debug, Clone)]
pub struct VisibilityCoordinator {
    visible: Vec<bool>,
    sets: Vec<ExclusiveSet>,
}

impl VisibilityCoordinator {
    /// Flags start at each layer's declared visibility; no sets yet.
    pub fn new(model: &MapModel) -> Self {
        Self {
            visible: model.layers().iter().map(|l| l.initially_visible).collect(),
            sets: Vec::new(),
        }
    }

    /// Coordinator with per-group and cross-group exclusivity over the
    /// model's pollutant groups.
    pub fn for_model(model: &MapModel) -> Result<Self, VisibilityError> {
        let mut coordinator = Self::new(model);
        for group in model.pollutant_groups() {
            coordinator.enforce_group_exclusivity(group)?;
        }
        coordinator.enforce_cross_group_exclusivity(model.pollutant_groups())?;
        Ok(coordinator)
    }

    /// Make every layer of `group` mutually exclusive.
    ///
    /// Returns the hides needed to bring the group into line if several
    /// members were already visible.
    pub fn enforce_group_exclusivity(
        &mut self,
        group: &Group,
    ) -> Result<Vec<VisibilityChange>, VisibilityError> {
        self.add_set(group.layer_ids())
    }

    /// Make every layer of every listed group mutually exclusive
    pub fn enforce_cross_group_exclusivity<'a>(
        &mut self,
        groups: impl IntoIterator<Item = &'a Group>,
    ) -> Result<Vec<VisibilityChange>, VisibilityError> {
        let members = groups.into_iter().flat_map(Group::layer_ids).collect();
        self.add_set(members)
    }

    fn add_set(&mut self, members: Vec<LayerId>) -> Result<Vec<VisibilityChange>, VisibilityError> {
        for &id in &members {
            self.check(id)?;
        }

        let mut changes = Vec::new();
        let mut active = None;
        for &id in &members {
            if !self.visible[id.0] {
                continue;
            }
            if active.is_none() {
                active = Some(id);
            } else {
                self.hide(id, &mut changes);
            }
        }

        debug!(members = members.len(), ?active, hidden = changes.len(), "exclusive set registered");
        self.sets.push(ExclusiveSet { members, active });
        Ok(changes)
    }

    /// Set one layer's flag and settle every exclusive set it belongs to.
    ///
    /// The requested change comes first in the result, followed by the
    /// layers it pushed out. Setting a flag to its current value changes
    /// nothing and returns an empty list.
    pub fn set_visible(
        &mut self,
        id: LayerId,
        visible: bool,
    ) -> Result<Vec<VisibilityChange>, VisibilityError> {
        self.check(id)?;
        if self.visible[id.0] == visible {
            return Ok(Vec::new());
        }

        let mut changes = Vec::new();
        if !visible {
            self.hide(id, &mut changes);
            return Ok(changes);
        }

        self.visible[id.0] = true;
        changes.push(VisibilityChange::shown(id));

        let displaced: Vec<LayerId> = self
            .sets
            .iter_mut()
            .filter(|set| set.contains(id))
            .filter_map(|set| set.active.replace(id).filter(|&prev| prev != id))
            .collect();
        for prev in displaced {
            self.hide(prev, &mut changes);
        }

        debug!(layer = id.0, changes = changes.len(), "visibility settled");
        Ok(changes)
    }

    /// Hide `id` and release every slot it holds
    fn hide(&mut self, id: LayerId, changes: &mut Vec<VisibilityChange>) {
        if !self.visible[id.0] {
            return;
        }
        self.visible[id.0] = false;
        for set in &mut self.sets {
            if set.active == Some(id) {
                set.active = None;
            }
        }
        changes.push(VisibilityChange::hidden(id));
    }

    fn check(&self, id: LayerId) -> Result<(), VisibilityError> {
        if id.0 < self.visible.len() {
            Ok(())
        } else {
            Err(VisibilityError::UnknownLayer(id))
        }
    }

    /// Unknown layers read as hidden
    pub fn is_visible(&self, id: LayerId) -> bool {
        self.visible.get(id.0).copied().unwrap_or(false)
    }

    pub fn visible_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.visible
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(|(idx, _)| LayerId(idx))
    }

    /// Visible member of the first exclusive set containing `id`
    #[cfg(test)]
    pub fn active_peer(&self, id: LayerId) -> Option<LayerId> {
        self.sets.iter().find(|set| set.contains(id))?.active
    }
}
