pub mod atlas;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod import;
pub mod map;
pub mod remote;
pub mod tiled;
pub mod tiles;

pub use cache::{AssetCacheStore, CachedAsset};
pub use error::{ImportError, ImportResult};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use import::{import_with_cache, ImportOptions, ImportSummary};
pub use map::{MapDocument, MapObject};
