//! Base64 `data:` URL images, as sent by the frontend for recipe pictures and
//! avatars, persisted under the media root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("Expected a data:image/...;base64,... string")]
    NotDataUrl,

    #[error("Image payload is not valid base64")]
    InvalidBase64,

    #[error("Uploaded file is not a supported image")]
    UnsupportedFormat,
}

#[derive(Debug)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Decode `data:image/<type>;base64,<payload>`. The extension comes from the
/// sniffed content, not from the declared media type.
pub fn decode_data_url(data: &str) -> Result<DecodedImage, ImageError> {
    let rest = data.trim().strip_prefix("data:image/").ok_or(ImageError::NotDataUrl)?;
    let (_declared, payload) = rest.split_once(";base64,").ok_or(ImageError::NotDataUrl)?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| ImageError::InvalidBase64)?;
    let format = image::guess_format(&bytes).map_err(|_| ImageError::UnsupportedFormat)?;
    let extension = format
        .extensions_str()
        .first()
        .copied()
        .ok_or(ImageError::UnsupportedFormat)?;

    Ok(DecodedImage { bytes, extension })
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Write the image under `<root>/<folder>/` and return its media-relative path.
    pub fn save(&self, folder: &str, image: &DecodedImage) -> io::Result<String> {
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir)?;

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), image.extension);
        fs::write(dir.join(&file_name), &image.bytes)?;
        Ok(format!("{folder}/{file_name}"))
    }

    /// Best effort; a missing file is not an error.
    pub fn remove(&self, relative: &str) {
        let path = self.root.join(Path::new(relative));
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove media file {}: {e}", path.display()),
        }
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.url_prefix, relative)
    }
}
