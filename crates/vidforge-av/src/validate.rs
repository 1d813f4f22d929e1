//! Asset validation: existence, size, MIME allow-list, and metadata.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use vidforge_common::{AssetDescriptor, Error, Result};

use crate::detect::{DetectorPipeline, ExtensionDetector, MagicDetector, ProbeDetector};
use crate::probe::FfprobeProber;
use crate::tools::ToolRegistry;

/// Turns a path into an [`AssetDescriptor`] or a typed rejection.
#[derive(Debug)]
pub struct FormatValidator {
    detectors: DetectorPipeline,
    prober: Option<FfprobeProber>,
}

impl FormatValidator {
    pub fn new(detectors: DetectorPipeline, prober: Option<FfprobeProber>) -> Self {
        Self { detectors, prober }
    }

    /// Standard pipeline: magic bytes, then extension, then ffprobe when it
    /// is installed. Without ffprobe, metadata extraction is skipped.
    pub fn from_tools(tools: &ToolRegistry, probe_timeout: Duration) -> Self {
        let prober = tools
            .get("ffprobe")
            .map(|path| FfprobeProber::new(path, probe_timeout));

        let mut detectors: Vec<Box<dyn crate::detect::Detector>> = vec![
            Box::new(MagicDetector::new()),
            Box::new(ExtensionDetector::new()),
        ];
        match &prober {
            Some(p) => detectors.push(Box::new(ProbeDetector::new(p.clone()))),
            None => tracing::warn!("ffprobe not available; probe detection and metadata disabled"),
        }

        Self::new(DetectorPipeline::new(detectors), prober)
    }

    /// Validate the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing (or a non-file) is at `path`
    /// - [`Error::EmptyOrCorrupt`] if the file is zero bytes or unreadable
    /// - [`Error::UnsupportedFormat`] if no detector produced an allowed type
    pub async fn validate(&self, path: &Path) -> Result<AssetDescriptor> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("asset", path.display()));
            }
            Err(e) => {
                return Err(Error::EmptyOrCorrupt(format!(
                    "{}: {e}",
                    path.display()
                )));
            }
        };

        if !meta.is_file() {
            return Err(Error::not_found("asset", path.display()));
        }
        if meta.len() == 0 {
            return Err(Error::EmptyOrCorrupt(format!(
                "{} is zero bytes",
                path.display()
            )));
        }

        let detection = self.detectors.detect(path).await;
        let mime_type = match detection {
            Some(d) if d.mime_type.is_allowed() => d.mime_type,
            Some(d) => {
                tracing::info!(
                    path = %path.display(),
                    mime = %d.mime_type,
                    detector = d.detector,
                    "Rejecting unsupported format"
                );
                return Err(Error::unsupported(Some(d.mime_type.as_str())));
            }
            None => {
                tracing::info!(path = %path.display(), "No detector recognised the file");
                return Err(Error::unsupported(None));
            }
        };

        let metadata = match &self.prober {
            Some(prober) => match prober.metadata(path).await {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Metadata probe failed");
                    None
                }
            },
            None => None,
        };

        Ok(AssetDescriptor::new(
            path.to_path_buf(),
            meta.len(),
            mime_type,
            metadata,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vidforge_common::mime;

    fn validator() -> FormatValidator {
        FormatValidator::from_tools(&ToolRegistry::empty(), Duration::from_secs(1))
    }

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    fn mp4_bytes() -> Vec<u8> {
        let mut v = vec![0x00, 0x00, 0x00, 0x18];
        v.extend_from_slice(b"ftypisom");
        v.extend_from_slice(&[0u8; 64]);
        v
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = validator().validate(&dir.path().join("nope.mp4")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = validator().validate(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn zero_byte_file_is_empty_or_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.mp4", b"");
        let err = validator().validate(&path).await.unwrap_err();
        assert!(matches!(err, Error::EmptyOrCorrupt(_)));
    }

    #[tokio::test]
    async fn mp4_by_magic_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "clip.bin", &mp4_bytes());
        let desc = validator().validate(&path).await.unwrap();
        assert_eq!(desc.mime_type.as_str(), mime::MP4);
        assert!(desc.is_supported_container);
        assert_eq!(desc.size_bytes, mp4_bytes().len() as u64);
        assert!(desc.metadata.is_none());
    }

    #[tokio::test]
    async fn magic_beats_misleading_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "clip.mkv", &mp4_bytes());
        let desc = validator().validate(&path).await.unwrap();
        assert!(desc.is_supported_container);
    }

    #[tokio::test]
    async fn extension_used_when_magic_abstains() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "clip.webm", b"no recognisable signature here");
        let desc = validator().validate(&path).await.unwrap();
        assert_eq!(desc.mime_type.as_str(), mime::WEBM);
        assert!(!desc.is_supported_container);
    }

    #[tokio::test]
    async fn non_video_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "clip.mp4", b"\x89PNG\r\n\x1a\n0000000000");
        let err = validator().validate(&path).await.unwrap_err();
        match err {
            Error::UnsupportedFormat { detected } => assert_eq!(detected, "image/png"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unrecognised_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "mystery", b"plain bytes");
        let err = validator().validate(&path).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }
}
