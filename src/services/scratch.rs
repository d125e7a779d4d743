// src/services/scratch.rs
use crate::errors::RedesignError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Short-lived on-disk copy of an image for providers that take file input.
///
/// The file is removed when the guard is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn create(data: &[u8], mime_type: &str) -> Result<Self, RedesignError> {
        let mut file = tempfile::Builder::new()
            .prefix("restyle-")
            .suffix(extension_for(mime_type))
            .tempfile()
            .map_err(|e| RedesignError::Internal(format!("Failed to create scratch file: {}", e)))?;

        file.write_all(data)
            .and_then(|_| file.flush())
            .map_err(|e| RedesignError::Internal(format!("Failed to write scratch file: {}", e)))?;

        log::debug!("Created scratch file {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        log::debug!("Releasing scratch file {}", self.file.path().display());
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        _ => ".img",
    }
}
