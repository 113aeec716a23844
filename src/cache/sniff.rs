//! Image format detection from the leading bytes of a downloaded payload.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpg,
}

impl ImageFormat {
    /// File suffix used when naming the cached asset.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

/// Number of leading bytes callers should hand to [`sniff`].
pub const HEADER_LEN: usize = 4;

/// Classifies a payload prefix. JPEG only needs its first three bytes, the
/// fourth varies between encoders.
pub fn sniff(header: &[u8]) -> Option<ImageFormat> {
    match header {
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(ImageFormat::Png),
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpg),
        _ => None,
    }
}
