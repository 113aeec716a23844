use crate::error::{ImportError, ImportResult};
use crate::tiles::TileRecord;
use image::RgbaImage;
use std::fs;
use std::path::Path;

/// Unique tiles composited into one near-square image. Tile `i` sits in cell
/// `(i % columns, i / columns)`.
#[derive(Debug, Clone)]
pub struct Atlas {
    pub image: RgbaImage,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
    pub rows: u32,
    pub tiles: Vec<TileRecord>,
}

impl Atlas {
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Pixel origin of atlas cell `index`.
    pub fn cell_origin(&self, index: u32) -> (u32, u32) {
        ((index % self.columns) * self.tile_width, (index / self.columns) * self.tile_height)
    }

    pub fn save_png(&self, path: &Path) -> ImportResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ImportError::io(parent, err))?;
        }
        self.image.save_with_format(path, image::ImageFormat::Png).map_err(|err| ImportError::image(path, err))
    }
}

/// Packs `tiles` in order, `ceil(sqrt(n))` columns wide. Tile size comes from
/// the first tile; the rest are expected to match.
pub fn pack(tiles: Vec<TileRecord>) -> Atlas {
    if tiles.is_empty() {
        return Atlas { image: RgbaImage::new(0, 0), tile_width: 0, tile_height: 0, columns: 0, rows: 0, tiles };
    }
    let (tile_width, tile_height) = tiles[0].content.dimensions();
    let count = tiles.len() as u32;
    let columns = ceil_sqrt(count);
    let rows = count.div_ceil(columns);
    let mut image = RgbaImage::new(columns * tile_width, rows * tile_height);
    for (index, tile) in tiles.iter().enumerate() {
        let index = index as u32;
        let origin_x = (index % columns) * tile_width;
        let origin_y = (index / columns) * tile_height;
        debug_assert_eq!(tile.content.dimensions(), (tile_width, tile_height), "atlas tiles share one size");
        for (x, y, pixel) in tile.content.enumerate_pixels() {
            image.put_pixel(origin_x + x, origin_y + y, *pixel);
        }
    }
    Atlas { image, tile_width, tile_height, columns, rows, tiles }
}

fn ceil_sqrt(n: u32) -> u32 {
    let mut root = (n as f64).sqrt() as u32;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root
}
