//! MIME type detection.
//!
//! A [`Detector`] inspects a file and either names its MIME type or abstains.
//! The [`DetectorPipeline`] runs detectors in order and stops at the first
//! answer, so cheaper or more trustworthy detectors go first:
//!
//! 1. [`MagicDetector`] -- leading signature bytes
//! 2. [`ExtensionDetector`] -- file name extension
//! 3. [`ProbeDetector`] -- ffprobe sees a video stream

mod extension;
mod magic;
mod probe;

use std::path::Path;

use async_trait::async_trait;
use vidforge_common::MimeType;

pub use extension::ExtensionDetector;
pub use magic::{sniff, MagicDetector};
pub use probe::ProbeDetector;

/// A single MIME detection strategy.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return the detected type, or `None` to defer to the next detector.
    ///
    /// Detectors never fail: I/O or tool problems are logged and treated as
    /// "no opinion".
    async fn detect(&self, path: &Path) -> Option<MimeType>;
}

/// The result of a successful detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub mime_type: MimeType,
    /// Name of the detector that produced the answer.
    pub detector: &'static str,
}

/// Ordered list of detectors where the first non-`None` answer wins.
pub struct DetectorPipeline {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorPipeline {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// Names of the configured detectors, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub async fn detect(&self, path: &Path) -> Option<Detection> {
        for detector in &self.detectors {
            match detector.detect(path).await {
                Some(mime_type) => {
                    tracing::debug!(
                        detector = detector.name(),
                        mime = %mime_type,
                        path = %path.display(),
                        "Detected MIME type"
                    );
                    return Some(Detection {
                        mime_type,
                        detector: detector.name(),
                    });
                }
                None => {
                    tracing::trace!(detector = detector.name(), "Detector abstained");
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for DetectorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorPipeline")
            .field("detectors", &self.names())
            .finish()
    }
}
