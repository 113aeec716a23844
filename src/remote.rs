//! Read-only client for the map-hosting service: editable spaces, maps in a
//! space, and a single map document.

use crate::error::{ImportError, ImportResult};
use crate::fetch::{FetchResponse, Fetcher};
use crate::map::MapDocument;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use reqwest::Url;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpaceSummary {
    #[serde(alias = "spaceId")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapSummary {
    #[serde(alias = "mapId")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub struct RemoteClient<'a> {
    base_url: String,
    api_key: String,
    fetcher: &'a mut dyn Fetcher,
}

impl<'a> RemoteClient<'a> {
    pub fn new(base_url: &str, api_key: &str, fetcher: &'a mut dyn Fetcher) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), api_key: api_key.to_string(), fetcher }
    }

    pub fn list_spaces(&mut self) -> ImportResult<Vec<SpaceSummary>> {
        let url = self.endpoint(&["api", "v2", "users", "me", "spaces"])?;
        self.get_json(url.as_str())
    }

    pub fn list_maps(&mut self, space_id: &str) -> ImportResult<Vec<MapSummary>> {
        let url = self.endpoint(&["api", "v2", "spaces", space_id, "maps"])?;
        self.get_json(url.as_str())
    }

    pub fn get_map(&mut self, space_id: &str, map_id: &str) -> ImportResult<MapDocument> {
        let url = self.endpoint(&["api", "v2", "spaces", space_id, "maps", map_id])?;
        let response = self.get_checked(url.as_str())?;
        MapDocument::parse(&response.body)
    }

    /// Appends `segments` to the base URL, escaping each one. Space ids carry
    /// `\` separators (`abc123\\My Space`) that must not reach the path raw.
    fn endpoint(&self, segments: &[&str]) -> ImportResult<Url> {
        let invalid = |message: String| ImportError::Transport { url: self.base_url.clone(), message };
        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(format!("invalid base URL: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&mut self, url: &str) -> ImportResult<T> {
        let response = self.get_checked(url)?;
        serde_json::from_slice(&response.body)
            .map_err(|err| ImportError::malformed(format!("unexpected response from {url}: {err}")))
    }

    fn get_checked(&mut self, url: &str) -> ImportResult<FetchResponse> {
        info!("Requesting {url}");
        let response = self.fetcher.get(url, &[("apiKey", self.api_key.as_str())])?;
        match response.status {
            200 => Ok(response),
            401 | 403 => Err(ImportError::Authentication { status: response.status, body: response.body_text() }),
            status => Err(ImportError::Fetch { url: url.to_string(), status, body: response.body_text() }),
        }
    }
}
