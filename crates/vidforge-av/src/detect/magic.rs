//! Signature ("magic byte") detection from the head of a file.

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use vidforge_common::{mime, MimeType};

use super::Detector;

/// Bytes read from the start of the file. Enough for two MPEG-TS packets.
const HEADER_LEN: usize = 512;

const EBML: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];
const ASF: &[u8] = &[0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11];
const MPEG_PS: &[u8] = &[0x00, 0x00, 0x01, 0xBA];
const MPEG_VIDEO: &[u8] = &[0x00, 0x00, 0x01, 0xB3];
const TS_SYNC: u8 = 0x47;
const TS_PACKET: usize = 188;

/// Identifies containers (and a few common non-video types) by signature.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicDetector;

impl MagicDetector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Detector for MagicDetector {
    fn name(&self) -> &'static str {
        "magic"
    }

    async fn detect(&self, path: &Path) -> Option<MimeType> {
        let header = match read_header(path).await {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Could not read header");
                return None;
            }
        };
        sniff(&header).map(MimeType::new)
    }
}

async fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64).read_to_end(&mut header).await?;
    Ok(header)
}

/// Map leading file bytes to a MIME type.
///
/// Non-video types are still reported so the validator can reject them by
/// name instead of letting a later detector guess from the extension.
pub fn sniff(header: &[u8]) -> Option<&'static str> {
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        return Some(match &header[8..12] {
            b"qt  " => mime::QUICKTIME,
            b"M4A " | b"M4B " => "audio/mp4",
            b"heic" | b"heix" | b"mif1" => "image/heic",
            brand if brand.starts_with(b"3g") => "video/3gpp",
            _ => mime::MP4,
        });
    }

    if header.starts_with(EBML) {
        let is_webm = header.windows(4).any(|w| w == b"webm");
        return Some(if is_webm { mime::WEBM } else { mime::MATROSKA });
    }

    if header.len() >= 12 && header.starts_with(b"RIFF") {
        return match &header[8..12] {
            b"AVI " => Some(mime::MSVIDEO),
            b"WAVE" => Some("audio/x-wav"),
            b"WEBP" => Some("image/webp"),
            _ => None,
        };
    }

    if header.starts_with(ASF) {
        return Some(mime::WMV);
    }

    if header.starts_with(MPEG_PS) || header.starts_with(MPEG_VIDEO) {
        return Some(mime::MPEG);
    }

    if header.len() > TS_PACKET && header[0] == TS_SYNC && header[TS_PACKET] == TS_SYNC {
        return Some("video/mp2t");
    }

    if header.starts_with(b"FLV\x01") {
        return Some("video/x-flv");
    }

    let others: &[(&[u8], &'static str)] = &[
        (&b"OggS"[..], "application/ogg"),
        (&b"\x89PNG\r\n\x1a\n"[..], "image/png"),
        (&b"\xFF\xD8\xFF"[..], "image/jpeg"),
        (&b"GIF87a"[..], "image/gif"),
        (&b"GIF89a"[..], "image/gif"),
        (&b"%PDF-"[..], "application/pdf"),
        (&b"PK\x03\x04"[..], "application/zip"),
    ];
    others
        .iter()
        .find(|(sig, _)| header.starts_with(sig))
        .map(|(_, found)| *found)
}
