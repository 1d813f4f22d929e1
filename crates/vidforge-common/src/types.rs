//! Asset model shared between validation, transcoding, and streaming.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Well-known MIME type strings.
pub mod mime {
    pub const MP4: &str = "video/mp4";
    pub const MATROSKA: &str = "video/x-matroska";
    pub const AVI: &str = "video/avi";
    pub const MSVIDEO: &str = "video/x-msvideo";
    pub const QUICKTIME: &str = "video/quicktime";
    pub const WEBM: &str = "video/webm";
    pub const WMV: &str = "video/x-ms-wmv";
    pub const MPEG: &str = "video/mpeg";
    /// Assigned when only the external probe recognised a video stream.
    pub const UNKNOWN_VIDEO: &str = "video/unknown";

    /// MIME types accepted for streaming.
    pub const SUPPORTED: &[&str] = &[
        MP4,
        MATROSKA,
        AVI,
        MSVIDEO,
        QUICKTIME,
        WEBM,
        WMV,
        MPEG,
        UNKNOWN_VIDEO,
    ];
}

/// A detected MIME type such as `video/mp4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeType(String);

impl MimeType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this type is on the streaming allow-list.
    pub fn is_allowed(&self) -> bool {
        mime::SUPPORTED.contains(&self.0.as_str())
    }

    /// Whether clients can play this container without conversion.
    pub fn is_mp4(&self) -> bool {
        self.0 == mime::MP4
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MimeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Basic properties of the primary video stream.
///
/// Serialized with the short keys used by the `X-Video-Metadata` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "fps")]
    pub frame_rate: f64,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
}

impl VideoMetadata {
    /// JSON payload for the `X-Video-Metadata` response header.
    pub fn header_value(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// The outcome of validating a media file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mime_type: MimeType,
    /// True only for MP4, which is served without conversion.
    pub is_supported_container: bool,
    pub metadata: Option<VideoMetadata>,
}

impl AssetDescriptor {
    pub fn new(
        path: PathBuf,
        size_bytes: u64,
        mime_type: MimeType,
        metadata: Option<VideoMetadata>,
    ) -> Self {
        let is_supported_container = mime_type.is_mp4();
        Self {
            path,
            size_bytes,
            mime_type,
            is_supported_container,
            metadata,
        }
    }

    /// File name component of the path, used for `Content-Disposition`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_allow_list() {
        assert!(MimeType::new("video/mp4").is_allowed());
        assert!(MimeType::new("video/x-matroska").is_allowed());
        assert!(MimeType::new("video/x-msvideo").is_allowed());
        assert!(MimeType::new("video/unknown").is_allowed());
        assert!(!MimeType::new("video/x-flv").is_allowed());
        assert!(!MimeType::new("image/png").is_allowed());
    }

    #[test]
    fn mime_is_normalized_to_lowercase() {
        let mime = MimeType::new("Video/MP4");
        assert_eq!(mime.as_str(), "video/mp4");
        assert!(mime.is_mp4());
    }

    #[test]
    fn descriptor_supported_only_for_mp4() {
        let mp4 = AssetDescriptor::new("a.mp4".into(), 10, MimeType::new(mime::MP4), None);
        assert!(mp4.is_supported_container);

        let mkv = AssetDescriptor::new("a.mkv".into(), 10, MimeType::new(mime::MATROSKA), None);
        assert!(!mkv.is_supported_container);
    }

    #[test]
    fn metadata_header_uses_short_keys() {
        let meta = VideoMetadata {
            width: 1920,
            height: 1080,
            frame_rate: 25.0,
            duration_seconds: 12.5,
        };
        let value: serde_json::Value = serde_json::from_str(&meta.header_value()).unwrap();
        assert_eq!(value["width"], 1920);
        assert_eq!(value["height"], 1080);
        assert_eq!(value["fps"], 25.0);
        assert_eq!(value["duration"], 12.5);
    }

    #[test]
    fn descriptor_file_name() {
        let desc = AssetDescriptor::new(
            PathBuf::from("/media/clip.webm"),
            1,
            MimeType::new(mime::WEBM),
            None,
        );
        assert_eq!(desc.file_name(), "clip.webm");
    }
}
