use std::path::{Path, PathBuf};

use thiserror::Error;

/// Uploads above this size are refused before any network traffic.
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentKind {
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(DocumentKind::Pdf)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(DocumentKind::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(DocumentKind::Png)
        } else {
            None
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Png => "image/png",
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("the selected file is empty")]
    Empty,
    #[error("file is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("only PDF, JPEG and PNG documents are accepted")]
    UnsupportedType,
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A salary document that passed the local checks and is ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub filename: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DocumentError> {
        check_size(bytes.len() as u64)?;
        let kind = DocumentKind::detect(&bytes).ok_or(DocumentError::UnsupportedType)?;
        Ok(Self {
            filename: filename.into(),
            kind,
            bytes,
        })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let read_error = |source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(read_error)?;
        check_size(metadata.len())?;
        let bytes = tokio::fs::read(path).await.map_err(read_error)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Self::from_bytes(filename, bytes)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn check_size(size: u64) -> Result<(), DocumentError> {
    if size == 0 {
        return Err(DocumentError::Empty);
    }
    if size > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge {
            size,
            max: MAX_DOCUMENT_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/document_tests.rs"]
mod tests;
