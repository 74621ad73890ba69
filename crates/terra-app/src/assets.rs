//! Texture file decoding.
//!
//! Files are decoded to RGBA8 with the `image` crate. A file that is missing
//! or cannot be decoded is replaced by a white texel so the rest of the
//! scene still renders.

use std::path::{Path, PathBuf};

use terra_render::TextureData;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("texture file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decode the image at `path` into RGBA8.
pub fn load_rgba(path: &Path) -> Result<TextureData, AssetError> {
    if !path.exists() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }
    let rgba = image::open(path)
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!("Decoded {} ({width}x{height})", path.display());
    Ok(TextureData {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// [`load_rgba`], falling back to a white texel on failure.
pub fn load_rgba_or_fallback(path: &Path) -> TextureData {
    load_rgba(path).unwrap_or_else(|err| {
        warn!("{err}; using a white placeholder texel");
        TextureData::white()
    })
}
