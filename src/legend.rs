//! Legend panels for the bivariate and AAD layer families.

use std::path::PathBuf;

use tracing::debug;

use crate::error::RegistryError;
use crate::layers::registry::titles;
use crate::layers::{LayerId, MapModel};
use crate::visibility::{VisibilityChange, VisibilityCoordinator, VisibilityObserver};

pub const BIVARIATE_LEGEND_ID: &str = "bivariate-legend";
pub const AAD_LEGEND_ID: &str = "aad-legend";

const BIVARIATE_IMAGE: &str = "pm2p5_images/legend_bivariate_5x5.png";

/// An overlay panel drawn at the bottom-left of the map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendPanel {
    pub id: &'static str,
    pub title: &'static str,
    pub visible: bool,
    /// Keeps the last image shown while the panel is hidden
    pub image: Option<PathBuf>,
}

impl LegendPanel {
    fn hidden(id: &'static str, title: &'static str, image: Option<PathBuf>) -> Self {
        Self {
            id,
            title,
            visible: false,
            image,
        }
    }
}

/// Shows and hides the two legend panels from layer visibility
#[derive(Debug, Clone)]
pub struct LegendPresenter {
    bivariate_layers: [LayerId; 3],
    /// In priority order: NO₂, PM2.5, PM10
    aad_layers: [(LayerId, &'static str); 3],
    images_dir: PathBuf,
    bivariate: LegendPanel,
    aad: LegendPanel,
}

impl LegendPresenter {
    pub fn new(model: &MapModel, images_dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let images_dir = images_dir.into();
        let bivariate_layers = [
            model.layer_by_title(titles::NO2_BIVARIATE)?,
            model.layer_by_title(titles::PM25_BIVARIATE)?,
            model.layer_by_title(titles::PM10_BIVARIATE)?,
        ];
        let aad_layers = [
            (model.layer_by_title(titles::NO2_AAD)?, "legend_no2.jpg"),
            (model.layer_by_title(titles::PM25_AAD)?, "legend_pm25.jpg"),
            (model.layer_by_title(titles::PM10_AAD)?, "legend_pm10.jpg"),
        ];

        Ok(Self {
            bivariate: LegendPanel::hidden(
                BIVARIATE_LEGEND_ID,
                "Bivariate Legend",
                Some(images_dir.join(BIVARIATE_IMAGE)),
            ),
            aad: LegendPanel::hidden(AAD_LEGEND_ID, "AAD 2017-2021 Legend", None),
            bivariate_layers,
            aad_layers,
            images_dir,
        })
    }

    /// Recompute both panels from `state`. Idempotent.
    pub fn update(&mut self, state: &VisibilityCoordinator) {
        self.bivariate.visible = self.bivariate_layers.iter().any(|&id| state.is_visible(id));

        match self.aad_layers.iter().find(|(id, _)| state.is_visible(*id)) {
            Some((_, image)) => {
                self.aad.image = Some(self.images_dir.join(image));
                self.aad.visible = true;
            }
            None => self.aad.visible = false,
        }

        debug!(
            bivariate = self.bivariate.visible,
            aad = self.aad.visible,
            "legends updated"
        );
    }

    /// Layers whose changes can affect a panel
    pub fn watches(&self, id: LayerId) -> bool {
        self.bivariate_layers.contains(&id) || self.aad_layers.iter().any(|(l, _)| *l == id)
    }

    pub fn bivariate(&self) -> &LegendPanel {
        &self.bivariate
    }

    pub fn aad(&self) -> &LegendPanel {
        &self.aad
    }

    /// Visible panels, bottom first
    pub fn visible_panels(&self) -> impl Iterator<Item = &LegendPanel> {
        [&self.bivariate, &self.aad].into_iter().filter(|p| p.visible)
    }
}

impl VisibilityObserver for LegendPresenter {
    fn visibility_changed(&mut self, changes: &[VisibilityChange], state: &VisibilityCoordinator) {
        if changes.iter().any(|c| self.watches(c.layer)) {
            self.update(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::layers::registry::BIVARIATE_FEATURES;
    use crate::layers::Registry;

    struct Fixture {
        model: MapModel,
        state: VisibilityCoordinator,
        legends: LegendPresenter,
    }

    impl Fixture {
        fn new() -> Self {
            let model = MapModel::compose(&Registry::germany(BIVARIATE_FEATURES, false)).unwrap();
            let state = VisibilityCoordinator::for_model(&model).unwrap();
            let mut legends = LegendPresenter::new(&model, "images").unwrap();
            legends.update(&state);
            Self {
                model,
                state,
                legends,
            }
        }

        fn show(&mut self, title: &str) {
            let id = self.model.layer_by_title(title).unwrap();
            let changes = self.state.set_visible(id, true).unwrap();
            self.legends.visibility_changed(&changes, &self.state);
        }
    }

    #[test]
    fn test_both_hidden_at_start() {
        let f = Fixture::new();
        assert!(!f.legends.bivariate().visible);
        assert!(!f.legends.aad().visible);
        assert_eq!(f.legends.visible_panels().count(), 0);
    }

    #[test]
    fn test_concentration_map_shows_no_legend() {
        let mut f = Fixture::new();
        f.show(titles::NO2_CONCENTRATION);
        assert!(!f.legends.bivariate().visible);
        assert!(!f.legends.aad().visible);
    }

    #[test]
    fn test_aad_image_follows_active_pollutant() {
        let mut f = Fixture::new();
        f.show(titles::NO2_AAD);
        assert!(f.legends.aad().visible);
        assert!(!f.legends.bivariate().visible);
        assert_eq!(
            f.legends.aad().image.as_deref(),
            Some(Path::new("images/legend_no2.jpg"))
        );

        f.show(titles::PM25_AAD);
        let no2 = f.model.layer_by_title(titles::NO2_AAD).unwrap();
        assert!(!f.state.is_visible(no2));
        assert!(f.legends.aad().visible);
        assert_eq!(
            f.legends.aad().image.as_deref(),
            Some(Path::new("images/legend_pm25.jpg"))
        );
    }

    #[test]
    fn test_bivariate_legend_for_any_bivariate_layer() {
        let mut f = Fixture::new();
        f.show(titles::PM10_BIVARIATE);
        assert!(f.legends.bivariate().visible);
        assert_eq!(
            f.legends.bivariate().image.as_deref(),
            Some(Path::new("images/pm2p5_images/legend_bivariate_5x5.png"))
        );

        f.show(titles::PM10_AAD);
        assert!(!f.legends.bivariate().visible);
        assert!(f.legends.aad().visible);
    }

    #[test]
    fn test_hidden_aad_keeps_last_image() {
        let mut f = Fixture::new();
        f.show(titles::PM10_AAD);
        f.show(titles::NO2_CONCENTRATION);
        assert!(!f.legends.aad().visible);
        assert_eq!(
            f.legends.aad().image.as_deref(),
            Some(Path::new("images/legend_pm10.jpg"))
        );
    }

    #[test]
    fn test_aad_priority_when_several_visible() {
        let model = MapModel::compose(&Registry::germany(BIVARIATE_FEATURES, false)).unwrap();
        // No exclusive sets, so several AAD layers can be on at once
        let mut state = VisibilityCoordinator::new(&model);
        let mut legends = LegendPresenter::new(&model, "images").unwrap();
        let aad = |title: &str| model.layer_by_title(title).unwrap();

        state.set_visible(aad(titles::PM10_AAD), true).unwrap();
        state.set_visible(aad(titles::PM25_AAD), true).unwrap();
        legends.update(&state);
        assert!(legends.aad().visible);
        assert_eq!(
            legends.aad().image.as_deref(),
            Some(Path::new("images/legend_pm25.jpg"))
        );

        state.set_visible(aad(titles::NO2_AAD), true).unwrap();
        legends.update(&state);
        assert_eq!(
            legends.aad().image.as_deref(),
            Some(Path::new("images/legend_no2.jpg"))
        );
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut f = Fixture::new();
        f.show(titles::PM25_AAD);
        let before = (f.legends.bivariate().clone(), f.legends.aad().clone());
        f.legends.update(&f.state);
        f.legends.update(&f.state);
        assert_eq!((f.legends.bivariate().clone(), f.legends.aad().clone()), before);
    }

    #[test]
    fn test_unwatched_changes_are_ignored() {
        let f = Fixture::new();
        let osm = f.model.layer_by_title(titles::OSM).unwrap();
        assert!(!f.legends.watches(osm));
    }
}
