//! One conversion run: fetch the map's images through the cache, reduce the
//! background to a deduplicated tile layer, and write a Tiled map.

use crate::atlas::{self, Atlas};
use crate::cache::AssetCacheStore;
use crate::error::{ImportError, ImportResult};
use crate::fetch::Fetcher;
use crate::grid::GridLayer;
use crate::map::MapDocument;
use crate::tiled::{MapObjectEntry, TileImage, TiledMap, Tileset};
use crate::tiles::{self, GridGeometry};
use image::{imageops, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const BACKGROUND_LAYER: &str = "background";
pub const FOREGROUND_LAYER: &str = "foreground";
pub const TILE_LAYER: &str = "background_tiles";
pub const OBJECT_LAYER: &str = "objects";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub tile_px: u32,
    pub output_dir: PathBuf,
    /// Base name for `<name>.tmj` and the `<name>_assets` directory.
    pub name: String,
    /// Rebuild the background from the atlas and compare it pixel for pixel.
    pub verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub map_path: PathBuf,
    pub atlas_path: Option<PathBuf>,
    pub grid_size: Option<(u32, u32)>,
    pub unique_tiles: usize,
    pub object_sprites: usize,
    pub objects: usize,
    /// Entries in the cache index once the run's fetches are recorded.
    pub cached_assets: usize,
    pub verified: Option<bool>,
}

/// Background decomposed into unique tiles plus the grid that references them.
#[derive(Debug, Clone)]
pub struct TiledBackground {
    pub atlas: Atlas,
    pub layer: GridLayer,
    pub geometry: GridGeometry,
}

impl TiledBackground {
    pub fn from_bitmap(bitmap: &RgbaImage, tile_px: u32) -> ImportResult<Self> {
        let slices = tiles::slice(bitmap, tile_px, tile_px);
        let geometry = slices.geometry();
        let deduped = tiles::dedup(slices);
        let layer = GridLayer::build(geometry.columns, geometry.rows, deduped.indices)?;
        let atlas = atlas::pack(deduped.tiles);
        Ok(Self { atlas, layer, geometry })
    }

    /// True when the atlas + grid reproduce the covered part of `bitmap`.
    pub fn reproduces(&self, bitmap: &RgbaImage) -> bool {
        let width = self.geometry.columns * self.geometry.tile_width;
        let height = self.geometry.rows * self.geometry.tile_height;
        if width == 0 || height == 0 {
            return true;
        }
        let covered = imageops::crop_imm(bitmap, 0, 0, width, height).to_image();
        self.layer.reconstruct(&self.atlas) == covered
    }
}

/// Runs an import with the cache index loaded from `cache_root` and flushed
/// only if the run succeeds.
pub fn import_with_cache(
    cache_root: &Path,
    index_name: &str,
    fetcher: &mut dyn Fetcher,
    map: &MapDocument,
    options: &ImportOptions,
) -> ImportResult<ImportSummary> {
    AssetCacheStore::scoped(cache_root, index_name, |store| run(store, fetcher, map, options))
}

pub fn run(
    store: &mut AssetCacheStore,
    fetcher: &mut dyn Fetcher,
    map: &MapDocument,
    options: &ImportOptions,
) -> ImportResult<ImportSummary> {
    if options.tile_px == 0 {
        return Err(ImportError::malformed("tile size must be greater than zero"));
    }
    let tile_px = options.tile_px;
    let mut tiled = TiledMap::new(map.width, map.height, tile_px);
    let mut summary = ImportSummary {
        map_path: options.output_dir.join(format!("{}.tmj", options.name)),
        atlas_path: None,
        grid_size: None,
        unique_tiles: 0,
        object_sprites: 0,
        objects: map.objects.len(),
        cached_assets: 0,
        verified: None,
    };

    if let Some(url) = map.background_image_path.as_deref() {
        let path = store.fetch(fetcher, url)?;
        tiled.add_image_layer(BACKGROUND_LAYER, &path);

        let bitmap = load_bitmap(&path)?;
        let background = TiledBackground::from_bitmap(&bitmap, tile_px)?;
        let GridLayer { width, height, .. } = background.layer;
        if (width, height) != (map.width, map.height) {
            warn!(
                "Background {url} covers {width}x{height} tiles but the map is {}x{}",
                map.width, map.height
            );
        }
        if options.verify {
            summary.verified = Some(background.reproduces(&bitmap));
        }
        info!(
            "Background {url}: {} cells reduced to {} unique tiles",
            background.layer.cells.len(),
            background.atlas.tile_count()
        );
        summary.unique_tiles = background.atlas.tile_count();
        summary.grid_size = Some((width, height));

        if background.atlas.is_empty() {
            warn!("Background {url} is smaller than one {tile_px}px tile; no tile layer written");
        } else {
            // Tiled resolves tileset images against the map file's directory.
            let atlas_image = atlas_image_path(&options.name);
            let atlas_path = options.output_dir.join(&atlas_image);
            background.atlas.save_png(&atlas_path)?;
            let firstgid = tiled.next_firstgid();
            let atlas = &background.atlas;
            tiled.tilesets.push(Tileset::from_atlas_image(
                firstgid,
                TILE_LAYER,
                &atlas_image,
                (atlas.tile_width, atlas.tile_height),
                atlas.columns,
                atlas.tile_count() as u32,
                atlas.image.dimensions(),
            ));
            let data = background.layer.cells.iter().map(|&index| firstgid + index).collect();
            tiled.add_tile_layer(TILE_LAYER, width, height, data);
            summary.atlas_path = Some(atlas_path);
        }
    }

    if let Some(url) = map.foreground_image_path.as_deref() {
        let path = store.fetch(fetcher, url)?;
        tiled.add_image_layer(FOREGROUND_LAYER, &path);
    }

    let (sprites, objects) = place_objects(store, fetcher, map, tile_px)?;
    summary.object_sprites = sprites.len();
    if !sprites.is_empty() {
        let firstgid = tiled.next_firstgid();
        tiled.tilesets.push(Tileset::image_collection(firstgid, OBJECT_LAYER, sprites));
        let objects = objects
            .into_iter()
            .map(|mut object| {
                object.gid += firstgid;
                object
            })
            .collect();
        tiled.add_object_group(OBJECT_LAYER, objects);
    } else {
        tiled.add_object_group(OBJECT_LAYER, Vec::new());
    }

    summary.cached_assets = store.len();
    tiled.save_to_path(&summary.map_path)?;
    info!("Wrote {}", summary.map_path.display());
    Ok(summary)
}

/// Atlas location relative to the `.tmj` file.
pub fn atlas_image_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{name}_assets")).join(format!("{TILE_LAYER}.png"))
}

/// One collection tile per distinct sprite URL; object gids are local tile
/// ids until the tileset's firstgid is known.
fn place_objects(
    store: &mut AssetCacheStore,
    fetcher: &mut dyn Fetcher,
    map: &MapDocument,
    tile_px: u32,
) -> ImportResult<(Vec<TileImage>, Vec<MapObjectEntry>)> {
    let mut sprites: Vec<TileImage> = Vec::new();
    let mut tiles_by_url: HashMap<&str, u32> = HashMap::new();
    let mut entries = Vec::with_capacity(map.objects.len());
    for object in &map.objects {
        let (x, y) = object.pixel_position(tile_px)?;
        let (width, height) = object.pixel_size(tile_px)?;
        let tile_id = match tiles_by_url.get(object.normal.as_str()) {
            Some(&id) => id,
            None => {
                let path = store.fetch(fetcher, &object.normal)?;
                let (imagewidth, imageheight) =
                    image::image_dimensions(&path).map_err(|err| ImportError::image(&path, err))?;
                let id = sprites.len() as u32;
                sprites.push(TileImage {
                    id,
                    image: path.to_string_lossy().replace('\\', "/"),
                    imagewidth,
                    imageheight,
                });
                tiles_by_url.insert(object.normal.as_str(), id);
                id
            }
        };
        entries.push(MapObjectEntry {
            id: 0,
            gid: tile_id,
            name: object.id.clone().unwrap_or_default(),
            kind: String::new(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            visible: true,
        });
    }
    Ok((sprites, entries))
}

fn load_bitmap(path: &Path) -> ImportResult<RgbaImage> {
    Ok(image::open(path).map_err(|err| ImportError::image(path, err))?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn repeated_background_collapses_to_few_tiles() {
        let mut bitmap = RgbaImage::from_pixel(96, 64, Rgba([20, 120, 20, 255]));
        for x in 32..64 {
            bitmap.put_pixel(x, 40, Rgba([200, 200, 0, 255]));
        }
        let background = TiledBackground::from_bitmap(&bitmap, 32).expect("tiles");
        assert_eq!((background.layer.width, background.layer.height), (3, 2));
        assert_eq!(background.atlas.tile_count(), 2);
        assert_eq!(background.layer.cells, vec![0, 0, 0, 0, 1, 0]);
        assert!(background.reproduces(&bitmap));
    }

    #[test]
    fn tiny_background_has_empty_atlas() {
        let bitmap = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let background = TiledBackground::from_bitmap(&bitmap, 32).expect("tiles");
        assert!(background.atlas.is_empty());
        assert!(background.layer.cells.is_empty());
        assert!(background.reproduces(&bitmap));
    }
}
