//! Persistent URL -> file cache for remote image assets.
//!
//! The index is a single JSON document loaded once per run and rewritten
//! whole at the end of a successful run. Asset files are durable as soon as
//! they are written; only the index write is deferred.

use crate::error::{ImportError, ImportResult};
use crate::fetch::Fetcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub mod sniff;
pub mod url_path;

pub use sniff::{sniff, ImageFormat};
pub use url_path::relative_path_for_url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<PathBuf>,
    #[serde(rename = "responseHeaders", default)]
    pub response_headers: BTreeMap<String, String>,
}

impl CachedAsset {
    /// Path of the cached file, if it is recorded and still on disk.
    pub fn valid_path(&self) -> Option<&Path> {
        self.dst.as_deref().filter(|path| path.is_file())
    }
}

#[derive(Debug)]
pub struct AssetCacheStore {
    root: PathBuf,
    index_path: PathBuf,
    entries: BTreeMap<String, CachedAsset>,
}

impl AssetCacheStore {
    /// Reads the index under `root`. A missing or unreadable index yields an
    /// empty store; the run then re-fetches everything.
    pub fn load(root: impl Into<PathBuf>, index_name: &str) -> Self {
        let root = root.into();
        let index_path = root.join(index_name);
        let entries = match read_index(&index_path) {
            Ok(Some(entries)) => {
                debug!("Loaded {} cache entries from {}", entries.len(), index_path.display());
                entries
            }
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!("{err}; starting with an empty cache");
                BTreeMap::new()
            }
        };
        Self { root, index_path, entries }
    }

    /// Loads the store, hands it to `run`, and flushes the index only when
    /// `run` succeeds. A failed run leaves the previous index untouched.
    pub fn scoped<T, E>(
        root: impl Into<PathBuf>,
        index_name: &str,
        run: impl FnOnce(&mut AssetCacheStore) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<ImportError>,
    {
        let mut store = Self::load(root, index_name);
        let value = run(&mut store)?;
        store.flush()?;
        Ok(value)
    }

    /// Overwrites the persisted index with the in-memory mapping.
    pub fn flush(&self) -> ImportResult<()> {
        let persistence = |message: String| ImportError::CachePersistence { path: self.index_path.clone(), message };
        fs::create_dir_all(&self.root).map_err(|err| persistence(format!("creating cache root: {err}")))?;
        let json = serde_json::to_string(&self.entries).map_err(|err| persistence(err.to_string()))?;
        let staging = self.index_path.with_extension("json.tmp");
        fs::write(&staging, json.as_bytes()).map_err(|err| persistence(format!("writing: {err}")))?;
        fs::rename(&staging, &self.index_path).map_err(|err| persistence(format!("replacing: {err}")))?;
        debug!("Flushed {} cache entries to {}", self.entries.len(), self.index_path.display());
        Ok(())
    }

    /// Returns a local path for `url`, downloading it only when no valid
    /// cached copy exists.
    pub fn fetch(&mut self, fetcher: &mut dyn Fetcher, url: &str) -> ImportResult<PathBuf> {
        if let Some(path) = self.entries.get(url).and_then(CachedAsset::valid_path) {
            info!("Returning {url} from cache.");
            return Ok(path.to_path_buf());
        }

        let response = fetcher.get(url, &[])?;
        if !response.is_success() {
            return Err(ImportError::Fetch {
                url: url.to_string(),
                status: response.status,
                body: response.body_text(),
            });
        }
        let header = &response.body[..response.body.len().min(sniff::HEADER_LEN)];
        let format = sniff(header)
            .ok_or_else(|| ImportError::UnrecognizedFormat { url: url.to_string(), header: header.to_vec() })?;

        let dst = self.root.join(format!("{}.{}", relative_path_for_url(url), format.extension()));
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|err| ImportError::io(parent, err))?;
        }
        info!("Saving to {}", dst.display());
        fs::write(&dst, &response.body).map_err(|err| ImportError::io(&dst, err))?;

        self.entries.insert(
            url.to_string(),
            CachedAsset { dst: Some(dst.clone()), response_headers: response.headers },
        );
        Ok(dst)
    }

    pub fn get(&self, url: &str) -> Option<&CachedAsset> {
        self.entries.get(url)
    }

    pub fn entries(&self) -> &BTreeMap<String, CachedAsset> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}

fn read_index(path: &Path) -> ImportResult<Option<BTreeMap<String, CachedAsset>>> {
    if !path.exists() {
        return Ok(None);
    }
    let persistence = |message: String| ImportError::CachePersistence { path: path.to_path_buf(), message };
    let bytes = fs::read(path).map_err(|err| persistence(format!("reading: {err}")))?;
    serde_json::from_slice(&bytes).map(Some).map_err(|err| persistence(format!("parsing: {err}")))
}
