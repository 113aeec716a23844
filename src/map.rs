//! Validated map documents as served by the map-hosting service.
//!
//! Raw JSON is deserialized into loose `*File` shapes first and then checked
//! field by field, so a bad document fails before anything is fetched.

use crate::error::{ImportError, ImportResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub width: u32,
    pub height: u32,
    pub background_image_path: Option<String>,
    pub foreground_image_path: Option<String>,
    pub objects: Vec<MapObject>,
}

/// A sprite placed on the grid. Position and size are in tiles, offsets in
/// pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: Option<String>,
    pub x: i64,
    pub y: i64,
    pub offset_x: i64,
    pub offset_y: i64,
    pub width: u32,
    pub height: u32,
    pub normal: String,
}

impl MapObject {
    pub fn pixel_position(&self, tile_px: u32) -> ImportResult<(i64, i64)> {
        let tile_px = i64::from(tile_px);
        let x = self.x.checked_mul(tile_px).and_then(|x| x.checked_add(self.offset_x));
        let y = self.y.checked_mul(tile_px).and_then(|y| y.checked_add(self.offset_y));
        x.zip(y).ok_or_else(|| self.out_of_range("position"))
    }

    pub fn pixel_size(&self, tile_px: u32) -> ImportResult<(u32, u32)> {
        self.width
            .checked_mul(tile_px)
            .zip(self.height.checked_mul(tile_px))
            .ok_or_else(|| self.out_of_range("size"))
    }

    fn out_of_range(&self, what: &str) -> ImportError {
        ImportError::malformed(format!(
            "object {} {what} does not fit in pixel coordinates",
            self.id.as_deref().unwrap_or(&self.normal)
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapFile {
    dimensions: Option<Vec<Value>>,
    #[serde(default)]
    background_image_path: Option<Value>,
    #[serde(default)]
    foreground_image_path: Option<Value>,
    #[serde(default)]
    objects: Option<Vec<ObjectFile>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectFile {
    #[serde(default)]
    id: Option<Value>,
    x: Option<Value>,
    y: Option<Value>,
    #[serde(default)]
    offset_x: Option<Value>,
    #[serde(default)]
    offset_y: Option<Value>,
    width: Option<Value>,
    height: Option<Value>,
    normal: Option<Value>,
}

impl MapDocument {
    pub fn parse(bytes: &[u8]) -> ImportResult<Self> {
        let raw: MapFile = serde_json::from_slice(bytes)
            .map_err(|err| ImportError::malformed(format!("map document is not valid JSON: {err}")))?;
        Self::from_file(raw)
    }

    fn from_file(raw: MapFile) -> ImportResult<Self> {
        let dimensions = raw.dimensions.ok_or_else(|| ImportError::malformed("missing 'dimensions'"))?;
        let [width, height] = dimensions.as_slice() else {
            return Err(ImportError::malformed(format!(
                "'dimensions' must have two entries, found {}",
                dimensions.len()
            )));
        };
        let width = positive(width, "dimensions[0]")?;
        let height = positive(height, "dimensions[1]")?;
        let background_image_path = optional_url(raw.background_image_path, "backgroundImagePath")?;
        let foreground_image_path = optional_url(raw.foreground_image_path, "foregroundImagePath")?;
        let objects = raw
            .objects
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, object)| parse_object(index, object))
            .collect::<ImportResult<Vec<_>>>()?;
        Ok(Self { width, height, background_image_path, foreground_image_path, objects })
    }
}

fn parse_object(index: usize, raw: ObjectFile) -> ImportResult<MapObject> {
    let field = |name: &str| format!("objects[{index}].{name}");
    let required = |value: Option<Value>, name: &str| {
        value.ok_or_else(|| ImportError::malformed(format!("missing '{}'", field(name))))
    };
    let id = match raw.id {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        Some(other) => return Err(ImportError::malformed(format!("'{}' has unexpected value {other}", field("id")))),
    };
    let normal = match required(raw.normal, "normal")? {
        Value::String(url) if !url.trim().is_empty() => url,
        other => {
            return Err(ImportError::malformed(format!("'{}' must be a non-empty URL, got {other}", field("normal"))))
        }
    };
    Ok(MapObject {
        id,
        x: integer(&required(raw.x, "x")?, &field("x"))?,
        y: integer(&required(raw.y, "y")?, &field("y"))?,
        offset_x: raw.offset_x.map(|v| integer(&v, &field("offsetX"))).transpose()?.unwrap_or(0),
        offset_y: raw.offset_y.map(|v| integer(&v, &field("offsetY"))).transpose()?.unwrap_or(0),
        width: positive(&required(raw.width, "width")?, &field("width"))?,
        height: positive(&required(raw.height, "height")?, &field("height"))?,
        normal,
    })
}

fn integer(value: &Value, name: &str) -> ImportResult<i64> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 && n.is_finite() => Ok(n as i64),
        _ => Err(ImportError::malformed(format!("'{name}' must be an integer, got {value}"))),
    }
}

fn positive(value: &Value, name: &str) -> ImportResult<u32> {
    let n = integer(value, name)?;
    u32::try_from(n)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| ImportError::malformed(format!("'{name}' must be a positive integer, got {n}")))
}

fn optional_url(value: Option<Value>, name: &str) -> ImportResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(url)) if url.is_empty() => Ok(None),
        Some(Value::String(url)) => Ok(Some(url)),
        Some(other) => Err(ImportError::malformed(format!("'{name}' must be a string, got {other}"))),
    }
}
