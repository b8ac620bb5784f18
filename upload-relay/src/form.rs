//! Multipart form collection.
//!
//! The whole form is read before any upload starts, so a malformed body never results in a
//! partial relay. Parts are grouped by field name in order of first appearance; within a
//! field, parts keep their arrival order. Parts without a filename are plain text fields
//! and are skipped, as are parts with an empty filename (a file input left blank).

use crate::errors::{Error, Result};
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{debug, trace};

/// One uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

/// Files of a form, grouped by field.
#[derive(Debug, Default)]
pub struct FormFiles {
    fields: Vec<(String, Vec<FileEntry>)>,
}

impl FormFiles {
    pub fn push(&mut self, entry: FileEntry) {
        match self.fields.iter_mut().find(|(name, _)| *name == entry.field) {
            Some((_, files)) => files.push(entry),
            None => self.fields.push((entry.field.clone(), vec![entry])),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.iter().map(|(_, files)| files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field order first, then order within the field.
    pub fn into_entries(self) -> Vec<FileEntry> {
        self.fields.into_iter().flat_map(|(_, files)| files).collect()
    }

    /// Drains the multipart stream into memory.
    pub async fn read(multipart: &mut Multipart) -> Result<Self> {
        let mut form = FormFiles::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| Error::FormParse {
            message: format!("Failed to parse multipart data: {}", e),
        })? {
            let name = field.name().unwrap_or("").to_string();

            let Some(filename) = field.file_name().filter(|s| !s.is_empty()).map(|s| s.to_string()) else {
                trace!(field = %name, "Skipping form field without a filename");
                // Still drain it so that malformed trailing data is detected.
                field.bytes().await.map_err(|e| Error::FormParse {
                    message: format!("Failed to read form field '{}': {}", name, e),
                })?;
                continue;
            };

            let content_type = field.content_type().map(|s| s.to_string());
            let content = field.bytes().await.map_err(|e| Error::FormParse {
                message: format!("Failed to read file '{}': {}", filename, e),
            })?;

            debug!(
                field = %name,
                filename = %filename,
                content_type = content_type.as_deref().unwrap_or("unknown"),
                size = content.len(),
                "Received file part"
            );

            form.push(FileEntry {
                field: name,
                filename,
                content_type,
                content,
            });
        }

        Ok(form)
    }
}
