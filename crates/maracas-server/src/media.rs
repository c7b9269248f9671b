//! Filesystem-backed image storage with public URL resolution.
//!
//! Uploaded product images are written under a random name so client file
//! names never reach the filesystem, and served statically from the media
//! root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::Rng;
use thiserror::Error;

/// Extensions accepted for product images.
const ALLOWED_EXTENSIONS: &[&str] = &["gif", "jpeg", "jpg", "png", "webp"];

const FILE_STEM_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported image extension: {0}")]
    UnsupportedExtension(String),
    #[error("failed to store image: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    public_base: String,
}

impl MediaStore {
    /// Creates the media root if needed.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] if the directory cannot be created.
    pub fn new(root: PathBuf, public_base: String) -> io::Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root, public_base })
    }

    /// Stores image bytes under a random file name and returns the public
    /// URL the file will be served at.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::UnsupportedExtension`] for extensions outside
    /// the whitelist, or [`MediaError::Io`] if the write fails.
    pub fn store(&self, extension: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(MediaError::UnsupportedExtension(ext));
        }

        let name = format!("{}.{ext}", random_file_stem());
        fs::write(self.root.join(&name), bytes)?;

        Ok(format!("{}/{name}", self.public_base.trim_end_matches('/')))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn random_file_stem() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(FILE_STEM_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}
