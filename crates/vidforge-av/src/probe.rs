//! ffprobe-backed stream inspection.
//!
//! Two queries are used: a cheap CSV check for whether a file has any video
//! stream at all (the last-resort format detector), and a JSON dump of
//! format and streams from which [`VideoMetadata`] is extracted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use vidforge_common::{Error, Result, VideoMetadata};

use crate::command::ToolCommand;

/// Runs `ffprobe` against media files.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    /// Whether ffprobe can see at least one video stream in `path`.
    pub async fn has_video_stream(&self, path: &Path) -> Result<bool> {
        let output = ToolCommand::new(&self.ffprobe_path)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=codec_type,width,height",
                "-of", "csv=p=0",
            ])
            .path_arg(path)
            .timeout(self.timeout)
            .execute()
            .await?;

        Ok(!output.stdout.trim().is_empty())
    }

    /// Extract metadata of the first video stream.
    ///
    /// Returns `Ok(None)` when the file has no video stream.
    pub async fn metadata(&self, path: &Path) -> Result<Option<VideoMetadata>> {
        let output = ToolCommand::new(&self.ffprobe_path)
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
            ])
            .path_arg(path)
            .timeout(self.timeout)
            .execute()
            .await?;

        let parsed: FfprobeOutput = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::tool("ffprobe", format!("JSON parse error: {e}")))?;

        Ok(extract_metadata(parsed))
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn extract_metadata(output: FfprobeOutput) -> Option<VideoMetadata> {
    let stream = output
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))?;

    // avg_frame_rate is "0/0" for some streams; fall back to r_frame_rate.
    let frame_rate = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    let duration_seconds = output
        .format
        .duration
        .as_deref()
        .or(stream.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Some(VideoMetadata {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        frame_rate,
        duration_seconds,
    })
}

/// Parse `"num/den"` or a plain decimal into frames per second.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}
