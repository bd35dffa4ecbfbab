//! Static layer catalogue for the Germany pollution map.
//!
//! Everything here is declarative: titles, remote identifiers and default
//! visibility. Identifiers are copied exactly as the GeoServer instance
//! publishes them, stray spaces included.

/// GeoServer WMS endpoint serving every remote pollutant layer
pub const WMS_URL: &str = "https://www.gis-geoserver.polimi.it/geoserver/gisgeoserver_01/wms";

/// OpenStreetMap XYZ tile template for the base layer
pub const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default location of the bivariate NO₂ feature collection (relative to the data dir)
pub const BIVARIATE_FEATURES: &str = "layer/Germany_no2_2020_bivariate.geojson";

pub mod groups {
    pub const BASE_MAPS: &str = "Base Maps";
    pub const LAND_COVER: &str = "Land Cover";
    pub const NOX: &str = "NO₂ (Nitrogen Dioxide)";
    pub const PM25: &str = "PM2.5 (Fine Particulate Matter)";
    pub const PM10: &str = "PM10 (Coarse Particulate Matter)";
}

/// Titles the legend presenter watches
pub mod titles {
    pub const OSM: &str = "OpenStreetMap";
    pub const NO2_CONCENTRATION: &str = "NO₂ Concentration Map 2020";
    pub const NO2_AAD: &str = "NO₂ AAD Map 2017-2021";
    pub const NO2_BIVARIATE: &str = "NO₂ Bivariate Map 2020";
    pub const PM25_AAD: &str = "PM2.5 AAD Map 2017-2021";
    pub const PM25_BIVARIATE: &str = "PM2.5 Bivariate Map 2020";
    pub const PM10_AAD: &str = "PM10 AAD Map 2017-2021";
    pub const PM10_BIVARIATE: &str = "PM10 Bivariate Map 2020";
}

/// Where a layer's pixels or features come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    /// XYZ tile service
    Tile { url_template: String },
    /// Rendered image from the WMS endpoint
    Wms {
        layers: String,
        styles: Option<String>,
    },
    /// In-memory features fetched from a local file or URL
    Vector { location: String },
}

/// A single declared layer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    pub title: String,
    pub source: LayerSource,
    pub visible: bool,
    /// Base layers are drawn underneath everything else
    pub base: bool,
}

impl LayerSpec {
    /// A WMS image layer, hidden until the user picks it
    pub fn wms(title: &str, layers: &str, styles: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            source: LayerSource::Wms {
                layers: layers.to_string(),
                styles: styles.map(str::to_string),
            },
            visible: false,
            base: false,
        }
    }

    pub fn tile(title: &str, url_template: &str) -> Self {
        Self {
            title: title.to_string(),
            source: LayerSource::Tile {
                url_template: url_template.to_string(),
            },
            visible: false,
            base: false,
        }
    }

    pub fn vector(title: &str, location: &str) -> Self {
        Self {
            title: title.to_string(),
            source: LayerSource::Vector {
                location: location.to_string(),
            },
            visible: false,
            base: false,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn as_base(mut self) -> Self {
        self.base = true;
        self
    }
}

/// A member of a group: either a leaf layer or a nested group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMember {
    Layer(LayerSpec),
    Group(GroupSpec),
}

impl From<LayerSpec> for GroupMember {
    fn from(spec: LayerSpec) -> Self {
        GroupMember::Layer(spec)
    }
}

impl From<GroupSpec> for GroupMember {
    fn from(spec: GroupSpec) -> Self {
        GroupMember::Group(spec)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub title: String,
    pub members: Vec<GroupMember>,
}

impl GroupSpec {
    pub fn new(title: &str, members: Vec<GroupMember>) -> Self {
        Self {
            title: title.to_string(),
            members,
        }
    }
}

/// Top-level groups in render order plus the titles of the exclusive ones
#[derive(Debug, Clone)]
pub struct Registry {
    pub groups: Vec<GroupSpec>,
    pub pollutant_groups: Vec<String>,
}

impl Registry {
    /// The Germany catalogue.
    ///
    /// `features` is where the bivariate NO₂ collection is fetched from.
    /// With `land_cover_exclusive` the land cover group joins the pollutant
    /// groups in the cross-group radio set.
    pub fn germany(features: &str, land_cover_exclusive: bool) -> Self {
        let base_maps = GroupSpec::new(
            groups::BASE_MAPS,
            vec![LayerSpec::tile(titles::OSM, OSM_URL_TEMPLATE)
                .with_visible(true)
                .as_base()
                .into()],
        );

        let land_cover = GroupSpec::new(
            groups::LAND_COVER,
            vec![LayerSpec::wms(
                "LC reclassified 2022",
                "Germany_LC_reclassified_2022",
                Some("LC_style"),
            )
            .into()],
        );

        let nox = GroupSpec::new(
            groups::NOX,
            vec![
                LayerSpec::wms(
                    titles::NO2_CONCENTRATION,
                    "gisgeoserver_01:GERMANY_no2_concentration_map_2020",
                    Some("LC_style"),
                )
                .into(),
                LayerSpec::wms(
                    "NO₂ Average 2022",
                    "gisgeoserver_01:GERMANY_average_no2_2022",
                    None,
                )
                .into(),
                LayerSpec::wms(
                    titles::NO2_AAD,
                    "gisgeoserver_01:GERMANY_no2_2017_2021_AAD_map_2022",
                    Some("GERMANY_no2_2017_2021_AAD_2022"),
                )
                .into(),
                // Served locally: the GeoServer instance cannot style this one
                LayerSpec::vector(titles::NO2_BIVARIATE, features).into(),
                LayerSpec::wms(
                    "CAMS NO₂ December 2022",
                    "gisgeoserver_01:GERMANY_CAMS_no2_2022_12",
                    None,
                )
                .into(),
            ],
        );

        let pm25 = GroupSpec::new(
            groups::PM25,
            vec![
                LayerSpec::wms(
                    "PM2.5 Concentration 2020",
                    "gisgeoserver_01:Germany_pm2p5_concentration_2020",
                    None,
                )
                .into(),
                LayerSpec::wms(
                    "PM2.5 Average 2022",
                    "gisgeoserver_01:Germany_average_pm2p5_2022",
                    None,
                )
                .into(),
                LayerSpec::wms(
                    titles::PM25_AAD,
                    "gisgeoserver_01:Germany_pm2p5_2017_2021_AAD_map _2022",
                    Some("Germany_pm2p5 _2017-2021_AAD_map _2022"),
                )
                .into(),
                LayerSpec::wms(
                    titles::PM25_BIVARIATE,
                    "gisgeoserver_01:Germany_pm2p5_2020_bivariate",
                    None,
                )
                .into(),
                LayerSpec::wms(
                    "CAMS PM2.5 December 2022",
                    "gisgeoserver_01:Germany_CAMS_pm2p5_2022_12",
                    None,
                )
                .into(),
            ],
        );

        let pm10 = GroupSpec::new(
            groups::PM10,
            vec![
                LayerSpec::wms(
                    "PM10 Concentration 2020",
                    "gisgeoserver_01:Germany_pm10_concentration_2020",
                    None,
                )
                .into(),
                LayerSpec::wms(
                    "PM10 Average 2022",
                    "gisgeoserver_01:Germany_average_pm10_2022",
                    None,
                )
                .into(),
                LayerSpec::wms(
                    titles::PM10_AAD,
                    "gisgeoserver_01:Germany_pm10_2017_2021_AAD_map_2022",
                    Some("Germany_pm2p5 _2017-2021_AAD_map _2022"),
                )
                .into(),
                LayerSpec::wms(
                    titles::PM10_BIVARIATE,
                    "gisgeoserver_01:Germany_pm10_2020_bivariate",
                    None,
                )
                .into(),
                LayerSpec::wms(
                    "CAMS PM10 December 2022",
                    "gisgeoserver_01:Germany_CAMS_pm10_2022_12",
                    None,
                )
                .into(),
            ],
        );

        let mut pollutant_groups = Vec::with_capacity(4);
        if land_cover_exclusive {
            pollutant_groups.push(groups::LAND_COVER.to_string());
        }
        pollutant_groups.extend([groups::NOX, groups::PM25, groups::PM10].map(str::to_string));

        Self {
            groups: vec![base_maps, land_cover, nox, pm25, pm10],
            pollutant_groups,
        }
    }
}
