//! Runs with a relative output directory, so it changes the process working
//! directory and lives in its own test binary.

use gather_tiled::{import_with_cache, FetchResponse, Fetcher, ImportOptions, ImportResult, MapDocument};
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

struct SingleImage {
    body: Vec<u8>,
}

impl Fetcher for SingleImage {
    fn get(&mut self, _url: &str, _headers: &[(&str, &str)]) -> ImportResult<FetchResponse> {
        Ok(FetchResponse { status: 200, headers: BTreeMap::new(), body: self.body.clone() })
    }
}

#[test]
fn tileset_image_resolves_from_map_directory() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    std::env::set_current_dir(temp_dir.path()).expect("enter temp dir");

    let background =
        RgbaImage::from_fn(64, 32, |x, _| if x < 32 { Rgba([10, 10, 10, 255]) } else { Rgba([200, 0, 0, 255]) });
    let mut body = Vec::new();
    DynamicImage::ImageRgba8(background)
        .write_to(&mut Cursor::new(&mut body), image::ImageFormat::Png)
        .expect("encode png");
    let mut fetcher = SingleImage { body };
    let map = MapDocument::parse(br#"{"dimensions":[2,1],"backgroundImagePath":"https://cdn.example.com/bg.png"}"#)
        .expect("map");
    let options = ImportOptions {
        tile_px: 32,
        output_dir: PathBuf::from("out"),
        name: "office".to_string(),
        verify: false,
    };

    let summary =
        import_with_cache(&temp_dir.path().join("cache"), "cache.json", &mut fetcher, &map, &options).expect("import");
    assert_eq!(summary.map_path, Path::new("out").join("office.tmj"));

    let tmj: Value = serde_json::from_slice(&fs::read(&summary.map_path).expect("read map")).expect("parse map");
    let tileset_image = tmj["tilesets"][0]["image"].as_str().expect("tileset image");
    let map_dir = summary.map_path.parent().expect("map dir");
    assert!(map_dir.join(tileset_image).is_file(), "{tileset_image} should resolve next to the map");
}
