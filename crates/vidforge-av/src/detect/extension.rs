//! Extension-based detection via `mime_guess`.

use std::path::Path;

use async_trait::async_trait;
use vidforge_common::MimeType;

use super::Detector;

/// Guesses the MIME type from the file name alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionDetector;

impl ExtensionDetector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Detector for ExtensionDetector {
    fn name(&self) -> &'static str {
        "extension"
    }

    async fn detect(&self, path: &Path) -> Option<MimeType> {
        mime_guess::from_path(path)
            .first()
            .map(|m| MimeType::new(m.essence_str()))
    }
}
