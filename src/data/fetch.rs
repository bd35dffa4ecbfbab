use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::layers::LayerId;
use crate::map::{mercator_to_lonlat, FeatureLayer};

use super::geojson_features::parse_feature_collection;

/// Something that can produce the raw bytes behind a feature location
pub trait FeatureFetcher: Send {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads locations as paths relative to a data directory
#[derive(Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FeatureFetcher for FileFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.root.join(location);
        debug!(path = %path.display(), "reading feature file");
        Ok(fs::read(path)?)
    }
}

/// Fetches `http(s)` locations with a blocking client.
///
/// Clones share the client's connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl FeatureFetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(location).send()?;
        let status = response.status();
        debug!(status = status.as_u16(), ok = status.is_success(), "feature response");
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Picks HTTP for URLs and the file system for everything else
#[derive(Clone)]
pub struct SourceFetcher {
    files: FileFetcher,
    http: HttpFetcher,
}

impl SourceFetcher {
    /// Builds the HTTP client once; clone the fetcher to reuse it
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        Ok(Self {
            files: FileFetcher::new(data_dir),
            http: HttpFetcher::new()?,
        })
    }

    fn is_url(location: &str) -> bool {
        location.starts_with("http://") || location.starts_with("https://")
    }
}

impl FeatureFetcher for SourceFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        if Self::is_url(location) {
            self.http.fetch(location)
        } else {
            self.files.fetch(location)
        }
    }
}

/// Result of one background fetch, delivered to the UI loop
pub struct FeatureLoad {
    pub layer: LayerId,
    pub location: String,
    pub result: Result<FeatureLayer, FetchError>,
}

/// Fetch, parse and reproject one feature collection
pub fn fetch_features(fetcher: &dyn FeatureFetcher, location: &str) -> Result<FeatureLayer, FetchError> {
    let mut bytes = fetcher.fetch(location)?;
    let features = parse_feature_collection(&mut bytes)?;
    let layer = FeatureLayer::from_features(features);

    if let Some(extent) = layer.extent() {
        let (west, south) = mercator_to_lonlat(extent.min_x, extent.min_y);
        let (east, north) = mercator_to_lonlat(extent.max_x, extent.max_y);
        info!(
            location,
            features = layer.len(),
            west, south, east, north,
            "feature collection loaded"
        );
    } else {
        warn!(location, "feature collection has no polygon features");
    }
    Ok(layer)
}

/// Run [`fetch_features`] on a background thread.
///
/// The receiver yields exactly one [`FeatureLoad`]. No retry, no cancellation.
pub fn spawn_fetch(fetcher: Box<dyn FeatureFetcher>, layer: LayerId, location: String) -> Receiver<FeatureLoad> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = fetch_features(fetcher.as_ref(), &location);
        // The UI may have quit already
        let _ = tx.send(FeatureLoad {
            layer,
            location,
            result,
        });
    });
    rx
}
