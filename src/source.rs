use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use ureq::Agent;

use crate::catalog::raw::{ChartInfoTable, RadarTable, RawDatasets, TitleTable};

/// Default base URL of the data tables.
pub const DEFAULT_BASE_URL: &str = "https://chinimuruhi.github.io/IIDX-Data-Table";

/// Dataset locations, relative to the base URL.
pub const TITLES_PATH: &str = "/textage/title.json";
pub const SP_RADAR_PATH: &str = "/notes_radar/sp.json";
pub const DP_RADAR_PATH: &str = "/notes_radar/dp.json";
pub const CHART_INFO_PATH: &str = "/textage/chart-info.json";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Somewhere the four raw datasets can be loaded from.
///
/// Loading is all-or-nothing: if any dataset fails, no datasets are returned.
pub trait DatasetSource {
    fn describe(&self) -> String;
    fn fetch_all(&self) -> Result<RawDatasets, FetchError>;
}

/// Fetches the datasets over HTTP, four requests in parallel.
pub struct HttpSource {
    agent: Agent,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("Fetching {url}");
        let http_err = |source: ureq::Error| FetchError::Http { url: url.clone(), source };

        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(http_err)?
            .body_mut()
            .with_config()
            .limit(64 * 1024 * 1024)
            .read_to_string()
            .map_err(http_err)?;

        let parsed = serde_json::from_str(&body).map_err(|source| FetchError::Json {
            name: path.to_string(),
            source,
        })?;
        log::debug!("  Got {} bytes from {url}", body.len());
        Ok(parsed)
    }
}

impl DatasetSource for HttpSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    fn fetch_all(&self) -> Result<RawDatasets, FetchError> {
        let ((titles, sp_radar), (dp_radar, chart_info)) = rayon::join(
            || {
                rayon::join(
                    || self.get::<TitleTable>(TITLES_PATH),
                    || self.get::<RadarTable>(SP_RADAR_PATH),
                )
            },
            || {
                rayon::join(
                    || self.get::<RadarTable>(DP_RADAR_PATH),
                    || self.get::<ChartInfoTable>(CHART_INFO_PATH),
                )
            },
        );

        Ok(RawDatasets {
            titles: titles?,
            sp_radar: sp_radar?,
            dp_radar: dp_radar?,
            chart_info: chart_info?,
        })
    }
}

/// Reads the datasets from a local directory holding `title.json`,
/// `sp.json`, `dp.json` and `chart-info.json`.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: DeserializeOwned>(&self, remote_path: &str) -> Result<T, FetchError> {
        let file_name = Path::new(remote_path)
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        let path = self.dir.join(&file_name);
        log::debug!("Reading {}", path.display());

        let contents = std::fs::read_to_string(&path)
            .map_err(|source| FetchError::Io { path: path.clone(), source })?;
        serde_json::from_str(&contents).map_err(|source| FetchError::Json { name: file_name, source })
    }
}

impl DatasetSource for DirSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn fetch_all(&self) -> Result<RawDatasets, FetchError> {
        Ok(RawDatasets {
            titles: self.read(TITLES_PATH)?,
            sp_radar: self.read(SP_RADAR_PATH)?,
            dp_radar: self.read(DP_RADAR_PATH)?,
            chart_info: self.read(CHART_INFO_PATH)?,
        })
    }
}
