//! Grid slicing and content-addressed tile deduplication.

use image::{imageops, RgbaImage};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Whole-tile columns and rows that fit in a bitmap. Partial trailing
/// columns/rows are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub columns: u32,
    pub rows: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl GridGeometry {
    pub fn for_bitmap(bitmap: &RgbaImage, tile_width: u32, tile_height: u32) -> Self {
        assert!(tile_width > 0 && tile_height > 0, "tile size must be non-zero");
        Self {
            columns: bitmap.width() / tile_width,
            rows: bitmap.height() / tile_height,
            tile_width,
            tile_height,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

/// Row-major iterator over owned tile copies. A clone walks the remaining
/// cells independently, so cloning before iteration restarts the sequence.
#[derive(Debug, Clone)]
pub struct TileSlices<'a> {
    source: &'a RgbaImage,
    geometry: GridGeometry,
    next: usize,
}

pub fn slice(bitmap: &RgbaImage, tile_width: u32, tile_height: u32) -> TileSlices<'_> {
    TileSlices { source: bitmap, geometry: GridGeometry::for_bitmap(bitmap, tile_width, tile_height), next: 0 }
}

impl TileSlices<'_> {
    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }
}

impl Iterator for TileSlices<'_> {
    type Item = RgbaImage;

    fn next(&mut self) -> Option<RgbaImage> {
        if self.next >= self.geometry.cell_count() {
            return None;
        }
        let GridGeometry { columns, tile_width, tile_height, .. } = self.geometry;
        let index = self.next as u32;
        self.next += 1;
        let x = (index % columns) * tile_width;
        let y = (index / columns) * tile_height;
        Some(imageops::crop_imm(self.source, x, y, tile_width, tile_height).to_image())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.geometry.cell_count() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileSlices<'_> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub id: u32,
    pub content: RgbaImage,
}

/// Unique tiles in first-seen order plus one id per input tile.
#[derive(Debug, Clone, Default)]
pub struct DedupedTiles {
    pub tiles: Vec<TileRecord>,
    pub indices: Vec<u32>,
}

/// Assigns ids by exact pixel content in a single pass. Tiles are bucketed
/// by a blake3 digest of their raw RGBA bytes and only merged when the bytes
/// and dimensions match exactly; a one-pixel difference always yields a new
/// tile.
pub fn dedup(tiles: impl IntoIterator<Item = RgbaImage>) -> DedupedTiles {
    let tiles = tiles.into_iter();
    let mut buckets: HashMap<blake3::Hash, SmallVec<[u32; 1]>> = HashMap::new();
    let mut out = DedupedTiles { tiles: Vec::new(), indices: Vec::with_capacity(tiles.size_hint().0) };
    for tile in tiles {
        let digest = blake3::hash(tile.as_raw());
        let bucket = buckets.entry(digest).or_default();
        let existing = bucket.iter().copied().find(|&id| {
            let known = &out.tiles[id as usize].content;
            known.dimensions() == tile.dimensions() && known.as_raw() == tile.as_raw()
        });
        let id = match existing {
            Some(id) => id,
            None => {
                let id = out.tiles.len() as u32;
                bucket.push(id);
                out.tiles.push(TileRecord { id, content: tile });
                id
            }
        };
        out.indices.push(id);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, (x ^ y) as u8, 255]))
    }

    #[test]
    fn slices_row_major_with_exact_regions() {
        let source = gradient(64, 32);
        let tiles: Vec<_> = slice(&source, 32, 32).collect();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0], imageops::crop_imm(&source, 0, 0, 32, 32).to_image());
        assert_eq!(tiles[1], imageops::crop_imm(&source, 32, 0, 32, 32).to_image());
    }

    #[test]
    fn partial_cells_are_dropped() {
        let source = gradient(70, 40);
        let slices = slice(&source, 32, 32);
        assert_eq!(slices.geometry(), GridGeometry { columns: 2, rows: 1, tile_width: 32, tile_height: 32 });
        assert_eq!(slices.len(), 2);
    }

    #[test]
    fn sliced_tiles_are_independent_copies() {
        let source = gradient(16, 8);
        let mut tiles: Vec<_> = slice(&source, 8, 8).collect();
        tiles[0].put_pixel(0, 0, Rgba([9, 9, 9, 9]));
        assert_ne!(tiles[0].get_pixel(0, 0), source.get_pixel(0, 0));
        let again: Vec<_> = slice(&source, 8, 8).collect();
        assert_eq!(again[0], imageops::crop_imm(&source, 0, 0, 8, 8).to_image());
    }

    #[test]
    fn slices_can_be_walked_twice() {
        let source = gradient(32, 32);
        let slices = slice(&source, 16, 16);
        let first: Vec<_> = slices.clone().collect();
        let second: Vec<_> = slices.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn dedup_assigns_first_seen_ids() {
        let a = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let b = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        let result = dedup(vec![a.clone(), a.clone(), b.clone()]);
        assert_eq!(result.indices, vec![0, 0, 1]);
        assert_eq!(result.tiles.len(), 2);
        assert_eq!(result.tiles[0], TileRecord { id: 0, content: a });
        assert_eq!(result.tiles[1], TileRecord { id: 1, content: b });
    }

    #[test]
    fn single_pixel_difference_is_not_merged() {
        let a = RgbaImage::from_pixel(4, 4, Rgba([10, 10, 10, 255]));
        let mut b = a.clone();
        b.put_pixel(3, 3, Rgba([10, 10, 11, 255]));
        let result = dedup(vec![a, b]);
        assert_eq!(result.indices, vec![0, 1]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let result = dedup(Vec::<RgbaImage>::new());
        assert!(result.tiles.is_empty());
        assert!(result.indices.is_empty());
    }
}
