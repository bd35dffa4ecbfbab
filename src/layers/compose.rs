use crate::error::RegistryError;
use crate::map::FeatureLayer;

use super::registry::{GroupMember, GroupSpec, LayerSource, Registry};

/// Stable index of a layer inside a [`MapModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

/// A composed layer: its declaration plus, for vector layers, the loaded features
pub struct Layer {
    pub id: LayerId,
    pub title: String,
    pub source: LayerSource,
    pub initially_visible: bool,
    pub base: bool,
    pub features: Option<FeatureLayer>,
}

impl Layer {
    pub fn is_vector(&self) -> bool {
        matches!(self.source, LayerSource::Vector { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupNode {
    Layer(LayerId),
    Group(Group),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub title: String,
    pub members: Vec<GroupNode>,
}

impl Group {
    /// All layers under this group, depth first
    pub fn layer_ids(&self) -> Vec<LayerId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<LayerId>) {
        for member in &self.members {
            match member {
                GroupNode::Layer(id) => ids.push(*id),
                GroupNode::Group(group) => group.collect_ids(ids),
            }
        }
    }
}

/// The composed map: layers indexed by [`LayerId`] and top-level groups in render order
pub struct MapModel {
    layers: Vec<Layer>,
    groups: Vec<Group>,
    pollutant_groups: Vec<usize>,
}

impl MapModel {
    /// Flatten the registry into layers and attach its groups in declaration order.
    pub fn compose(registry: &Registry) -> Result<Self, RegistryError> {
        let mut layers = Vec::new();
        let groups: Vec<Group> = registry
            .groups
            .iter()
            .map(|spec| compose_group(spec, &mut layers))
            .collect();

        let pollutant_groups = registry
            .pollutant_groups
            .iter()
            .map(|title| {
                groups
                    .iter()
                    .position(|g| &g.title == title)
                    .ok_or_else(|| RegistryError::UnknownGroup(title.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            layers,
            groups,
            pollutant_groups,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Groups subject to cross-group exclusivity
    pub fn pollutant_groups(&self) -> impl Iterator<Item = &Group> {
        self.pollutant_groups.iter().map(|&idx| &self.groups[idx])
    }

    pub fn is_pollutant(&self, id: LayerId) -> bool {
        self.pollutant_groups()
            .any(|group| group.layer_ids().contains(&id))
    }

    pub fn layer_by_title(&self, title: &str) -> Result<LayerId, RegistryError> {
        self.layers
            .iter()
            .find(|layer| layer.title == title)
            .map(|layer| layer.id)
            .ok_or_else(|| RegistryError::UnknownTitle(title.to_string()))
    }

    pub fn group_by_title(&self, title: &str) -> Result<&Group, RegistryError> {
        self.groups
            .iter()
            .find(|group| group.title == title)
            .ok_or_else(|| RegistryError::UnknownGroup(title.to_string()))
    }

    /// Vector layers and where their features come from
    pub fn vector_sources(&self) -> impl Iterator<Item = (LayerId, &str)> {
        self.layers.iter().filter_map(|layer| match &layer.source {
            LayerSource::Vector { location } => Some((layer.id, location.as_str())),
            _ => None,
        })
    }

    /// Append features to a vector layer. Returns false if `id` is not a vector layer.
    pub fn add_features(&mut self, id: LayerId, features: FeatureLayer) -> bool {
        match self.layers.get_mut(id.0) {
            Some(layer) if layer.is_vector() => {
                match layer.features.as_mut() {
                    Some(existing) => existing.extend(features),
                    None => layer.features = Some(features),
                }
                true
            }
            _ => false,
        }
    }
}

fn compose_group(spec: &GroupSpec, layers: &mut Vec<Layer>) -> Group {
    let members = spec
        .members
        .iter()
        .map(|member| match member {
            GroupMember::Layer(layer) => {
                let id = LayerId(layers.len());
                let features = matches!(layer.source, LayerSource::Vector { .. })
                    .then(FeatureLayer::default);
                layers.push(Layer {
                    id,
                    title: layer.title.clone(),
                    source: layer.source.clone(),
                    initially_visible: layer.visible,
                    base: layer.base,
                    features,
                });
                GroupNode::Layer(id)
            }
            GroupMember::Group(nested) => GroupNode::Group(compose_group(nested, layers)),
        })
        .collect();

    Group {
        title: spec.title.clone(),
        members,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::registry::{groups, titles, LayerSpec, BIVARIATE_FEATURES};

    fn germany() -> MapModel {
        MapModel::compose(&Registry::germany(BIVARIATE_FEATURES, false)).unwrap()
    }

    #[test]
    fn test_ids_follow_render_order() {
        let model = germany();
        assert_eq!(model.layers().len(), 17);
        for (idx, layer) in model.layers().iter().enumerate() {
            assert_eq!(layer.id, LayerId(idx));
        }
        assert_eq!(model.layers()[0].title, titles::OSM);
    }

    #[test]
    fn test_pollutant_membership() {
        let model = germany();
        let osm = model.layer_by_title(titles::OSM).unwrap();
        let lc = model.layer_by_title("LC reclassified 2022").unwrap();
        let aad = model.layer_by_title(titles::PM10_AAD).unwrap();
        assert!(!model.is_pollutant(osm));
        assert!(!model.is_pollutant(lc));
        assert!(model.is_pollutant(aad));
        assert_eq!(model.pollutant_groups().count(), 3);
    }

    #[test]
    fn test_nested_groups_flatten_depth_first() {
        let registry = Registry {
            groups: vec![GroupSpec::new(
                "outer",
                vec![
                    LayerSpec::wms("a", "a", None).into(),
                    GroupSpec::new("inner", vec![LayerSpec::wms("b", "b", None).into()]).into(),
                    LayerSpec::wms("c", "c", None).into(),
                ],
            )],
            pollutant_groups: vec!["outer".to_string()],
        };
        let model = MapModel::compose(&registry).unwrap();
        let outer = model.group_by_title("outer").unwrap();
        assert_eq!(outer.layer_ids(), vec![LayerId(0), LayerId(1), LayerId(2)]);
        assert!(matches!(outer.members[1], GroupNode::Group(_)));
    }

    #[test]
    fn test_unknown_pollutant_group_is_rejected() {
        let mut registry = Registry::germany(BIVARIATE_FEATURES, false);
        registry.pollutant_groups.push("Ozone".to_string());
        assert!(matches!(
            MapModel::compose(&registry),
            Err(RegistryError::UnknownGroup(title)) if title == "Ozone"
        ));
    }

    #[test]
    fn test_only_vector_layer_has_feature_storage() {
        let model = germany();
        let sources: Vec<_> = model.vector_sources().collect();
        assert_eq!(sources.len(), 1);
        let (id, location) = sources[0];
        assert_eq!(location, BIVARIATE_FEATURES);
        assert_eq!(model.layer(id).unwrap().title, titles::NO2_BIVARIATE);
        assert!(model.layer(id).unwrap().features.as_ref().unwrap().is_empty());

        let nox = model.group_by_title(groups::NOX).unwrap();
        assert!(nox.layer_ids().contains(&id));
    }

    #[test]
    fn test_add_features_rejects_raster_layers() {
        let mut model = germany();
        let osm = model.layer_by_title(titles::OSM).unwrap();
        assert!(!model.add_features(osm, FeatureLayer::default()));
    }
}
