//! Last-resort detection: ask ffprobe whether there is a video stream.

use std::path::Path;

use async_trait::async_trait;
use vidforge_common::{mime, MimeType};

use super::Detector;
use crate::probe::FfprobeProber;

/// Reports `video/unknown` when ffprobe finds a video stream that the
/// cheaper detectors could not name.
#[derive(Debug, Clone)]
pub struct ProbeDetector {
    prober: FfprobeProber,
}

impl ProbeDetector {
    pub fn new(prober: FfprobeProber) -> Self {
        Self { prober }
    }
}

#[async_trait]
impl Detector for ProbeDetector {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn detect(&self, path: &Path) -> Option<MimeType> {
        match self.prober.has_video_stream(path).await {
            Ok(true) => Some(MimeType::new(mime::UNKNOWN_VIDEO)),
            Ok(false) => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ffprobe detection failed");
                None
            }
        }
    }
}
