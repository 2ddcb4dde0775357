use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::ImageFormat;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ImageFileError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path:?} is empty")]
    Empty { path: PathBuf },
    #[error("{path:?} is not a recognised image")]
    NotAnImage { path: PathBuf },
}

/// An image file picked from disk, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    /// Absolute path of the file.
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl LocalImage {
    /// `file://` reference to the original file, used for the preview.
    pub fn preview_url(&self) -> Option<Url> {
        Url::from_file_path(&self.path).ok()
    }
}

/// Read an image file and work out its MIME type.
///
/// The type comes from the magic bytes first and the extension second; files
/// matching neither are rejected.
pub fn load_image_file(path: &Path) -> Result<LocalImage, ImageFileError> {
    let io_err = |source| ImageFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let absolute = fs::canonicalize(path).map_err(io_err)?;
    let bytes = fs::read(&absolute).map_err(io_err)?;
    if bytes.is_empty() {
        return Err(ImageFileError::Empty { path: absolute });
    }

    let format = image::guess_format(&bytes)
        .or_else(|_| ImageFormat::from_path(&absolute))
        .map_err(|_| ImageFileError::NotAnImage {
            path: absolute.clone(),
        })?;

    let name = absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(LocalImage {
        mime: format.to_mime_type().to_string(),
        name,
        path: absolute,
        bytes: Bytes::from(bytes),
    })
}
