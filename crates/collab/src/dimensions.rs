//! Image dimension fetcher (SPEC_FULL §11). When Mode B has to guess image
//! size it uses a placeholder; this fetches the real size in the background
//! so a later request for the same resource can use it instead.

use anyhow::Result;

pub const PLACEHOLDER_WIDTH: u32 = 1080;
pub const PLACEHOLDER_HEIGHT: u32 = 1920;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn placeholder() -> Self {
        Self { width: PLACEHOLDER_WIDTH, height: PLACEHOLDER_HEIGHT }
    }
}

/// Cheap to clone: wraps a `reqwest::Client`, which is itself a cheap `Arc`
/// handle, so a background task can own a copy without borrowing the caller.
#[derive(Clone)]
pub struct DimensionFetcher {
    client: reqwest::Client,
}

impl DimensionFetcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    /// Fetches just enough of the image (a `HEAD`/ranged `GET`, provider
    /// permitting) to read its header dimensions. Errors are the caller's
    /// to swallow — this fetch always runs as a detached background task
    /// (spec §5 "Background ... tasks are detached").
    pub async fn fetch(&self, image_url: &str) -> Result<ImageDimensions> {
        let bytes = self.client.get(image_url).send().await?.bytes().await?;
        decode_dimensions(&bytes).ok_or_else(|| anyhow::anyhow!("could not decode image header"))
    }
}

impl Default for DimensionFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal PNG/JPEG header sniffing; good enough to avoid depending on a
/// full image-decoding crate for a dimension-only read.
fn decode_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    // PNG: width/height are big-endian u32 at offset 16/20 of the IHDR chunk.
    if bytes.len() >= 24 && &bytes[0..8] == b"\x89PNG\r\n\x1a\n" {
        let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
        let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
        return Some(ImageDimensions { width, height });
    }

    // JPEG: scan markers for the first SOFn segment.
    if bytes.len() >= 4 && bytes[0] == 0xFF && bytes[1] == 0xD8 {
        let mut i = 2;
        while i + 9 < bytes.len() {
            if bytes[i] != 0xFF {
                i += 1;
                continue;
            }
            let marker = bytes[i + 1];
            if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
                let height = u16::from_be_bytes([bytes[i + 5], bytes[i + 6]]) as u32;
                let width = u16::from_be_bytes([bytes[i + 7], bytes[i + 8]]) as u32;
                return Some(ImageDimensions { width, height });
            }
            let segment_len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
            i += 2 + segment_len;
        }
    }

    None
}
