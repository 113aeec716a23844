use crate::atlas::Atlas;
use crate::error::{ImportError, ImportResult};
use image::RgbaImage;

/// `width x height` references into an atlas's tile order, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayer {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<u32>,
}

impl GridLayer {
    pub fn build(width: u32, height: u32, cells: Vec<u32>) -> ImportResult<Self> {
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(ImportError::GridMismatch { expected, actual: cells.len() });
        }
        Ok(Self { width, height, cells })
    }

    pub fn cell(&self, column: u32, row: u32) -> Option<u32> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.cells.get((row * self.width + column) as usize).copied()
    }

    /// Redraws the source bitmap by copying each cell's atlas tile back into
    /// place.
    pub fn reconstruct(&self, atlas: &Atlas) -> RgbaImage {
        let (tile_width, tile_height) = (atlas.tile_width, atlas.tile_height);
        let mut out = RgbaImage::new(self.width * tile_width, self.height * tile_height);
        for (cell, &tile) in self.cells.iter().enumerate() {
            let cell = cell as u32;
            let (dst_x, dst_y) = ((cell % self.width) * tile_width, (cell / self.width) * tile_height);
            let (src_x, src_y) = atlas.cell_origin(tile);
            for y in 0..tile_height {
                for x in 0..tile_width {
                    out.put_pixel(dst_x + x, dst_y + y, *atlas.image.get_pixel(src_x + x, src_y + y));
                }
            }
        }
        out
    }
}
