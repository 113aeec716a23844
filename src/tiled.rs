//! Tiled JSON (`.tmj`) map document written at the end of an import.

use crate::error::{ImportError, ImportResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const TILED_VERSION: &str = "1.10";

#[derive(Debug, Clone, Serialize)]
pub struct TiledMap {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub version: &'static str,
    pub orientation: &'static str,
    pub renderorder: &'static str,
    pub infinite: bool,
    pub width: u32,
    pub height: u32,
    pub tilewidth: u32,
    pub tileheight: u32,
    pub nextlayerid: u32,
    pub nextobjectid: u32,
    pub layers: Vec<Layer>,
    pub tilesets: Vec<Tileset>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    ImageLayer {
        id: u32,
        name: String,
        image: String,
        x: i64,
        y: i64,
        opacity: f32,
        visible: bool,
    },
    TileLayer {
        id: u32,
        name: String,
        width: u32,
        height: u32,
        x: i64,
        y: i64,
        data: Vec<u32>,
        opacity: f32,
        visible: bool,
    },
    ObjectGroup {
        id: u32,
        name: String,
        draworder: &'static str,
        objects: Vec<MapObjectEntry>,
        x: i64,
        y: i64,
        opacity: f32,
        visible: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MapObjectEntry {
    pub id: u32,
    pub gid: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub rotation: f32,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tileset {
    pub firstgid: u32,
    pub name: String,
    pub tilewidth: u32,
    pub tileheight: u32,
    pub tilecount: u32,
    pub columns: u32,
    pub margin: u32,
    pub spacing: u32,
    pub objectalignment: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileImage>,
}

/// One entry of an image-collection tileset.
#[derive(Debug, Clone, Serialize)]
pub struct TileImage {
    pub id: u32,
    pub image: String,
    pub imagewidth: u32,
    pub imageheight: u32,
}

impl TiledMap {
    pub fn new(width: u32, height: u32, tile_px: u32) -> Self {
        Self {
            kind: "map",
            version: TILED_VERSION,
            orientation: "orthogonal",
            renderorder: "right-down",
            infinite: false,
            width,
            height,
            tilewidth: tile_px,
            tileheight: tile_px,
            nextlayerid: 1,
            nextobjectid: 1,
            layers: Vec::new(),
            tilesets: Vec::new(),
        }
    }

    fn take_layer_id(&mut self) -> u32 {
        let id = self.nextlayerid;
        self.nextlayerid += 1;
        id
    }

    /// First gid not claimed by any tileset yet.
    pub fn next_firstgid(&self) -> u32 {
        self.tilesets.iter().map(|set| set.firstgid + set.tilecount).max().unwrap_or(1)
    }

    pub fn add_image_layer(&mut self, name: &str, image: &Path) {
        let id = self.take_layer_id();
        self.layers.push(Layer::ImageLayer {
            id,
            name: name.to_string(),
            image: image_path(image),
            x: 0,
            y: 0,
            opacity: 1.0,
            visible: true,
        });
    }

    pub fn add_tile_layer(&mut self, name: &str, width: u32, height: u32, data: Vec<u32>) {
        let id = self.take_layer_id();
        self.layers.push(Layer::TileLayer {
            id,
            name: name.to_string(),
            width,
            height,
            x: 0,
            y: 0,
            data,
            opacity: 1.0,
            visible: true,
        });
    }

    /// Adds an object group, assigning map-unique object ids in order.
    pub fn add_object_group(&mut self, name: &str, mut objects: Vec<MapObjectEntry>) {
        for object in &mut objects {
            object.id = self.nextobjectid;
            self.nextobjectid += 1;
        }
        let id = self.take_layer_id();
        self.layers.push(Layer::ObjectGroup {
            id,
            name: name.to_string(),
            draworder: "topdown",
            objects,
            x: 0,
            y: 0,
            opacity: 1.0,
            visible: true,
        });
    }

    pub fn save_to_path(&self, path: &Path) -> ImportResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ImportError::io(parent, err))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| ImportError::io(path, err.into()))?;
        fs::write(path, format!("{json}\n")).map_err(|err| ImportError::io(path, err))
    }
}

impl Tileset {
    /// Single-image tileset cut into a regular grid, e.g. a packed atlas.
    pub fn from_atlas_image(
        firstgid: u32,
        name: &str,
        image: &Path,
        tile_size: (u32, u32),
        columns: u32,
        tilecount: u32,
        image_size: (u32, u32),
    ) -> Self {
        Self {
            firstgid,
            name: name.to_string(),
            tilewidth: tile_size.0,
            tileheight: tile_size.1,
            tilecount,
            columns,
            margin: 0,
            spacing: 0,
            objectalignment: "unspecified",
            image: Some(image_path(image)),
            imagewidth: Some(image_size.0),
            imageheight: Some(image_size.1),
            tiles: Vec::new(),
        }
    }

    /// Tileset where every tile has its own image. Tile size is the largest
    /// image so Tiled sizes the palette sensibly.
    pub fn image_collection(firstgid: u32, name: &str, tiles: Vec<TileImage>) -> Self {
        let tilewidth = tiles.iter().map(|tile| tile.imagewidth).max().unwrap_or(0);
        let tileheight = tiles.iter().map(|tile| tile.imageheight).max().unwrap_or(0);
        Self {
            firstgid,
            name: name.to_string(),
            tilewidth,
            tileheight,
            tilecount: tiles.len() as u32,
            columns: 0,
            margin: 0,
            spacing: 0,
            objectalignment: "topleft",
            image: None,
            imagewidth: None,
            imageheight: None,
            tiles,
        }
    }
}

fn image_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
