//! Builds full (200) and partial (206) file responses.
//!
//! Bodies are streamed with `ReaderStream` in `chunk_size` reads, so memory
//! stays bounded regardless of file size. Small ranged reads on source files
//! go through the chunk cache instead.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use vidforge_av::DerivedFile;
use vidforge_common::{parse_range, ByteRange, Error, MimeType, Result, VideoMetadata};

use super::cache::{AssetCache, Fingerprint};

/// Everything needed to answer one request for one file.
#[derive(Debug)]
pub struct StreamSource {
    /// File whose bytes are sent.
    pub path: PathBuf,
    pub total_size: u64,
    /// `Content-Type` of the bytes sent.
    pub content_type: MimeType,
    /// Type detected on the source asset, for `X-Video-Original-Type`.
    pub original_type: MimeType,
    /// Name advertised in `Content-Disposition`.
    pub file_name: String,
    pub metadata: Option<VideoMetadata>,
    /// Set only for source files; derived files are never chunk-cached.
    pub fingerprint: Option<Fingerprint>,
    /// Keeps a transcoded file alive until the body is dropped.
    pub derived: Option<DerivedFile>,
}

/// Response settings taken from the streaming config.
#[derive(Debug, Clone)]
pub struct ResponderSettings {
    pub chunk_size: usize,
    pub cache_control: Option<String>,
}

/// Answer with the full file or the requested range.
///
/// # Errors
///
/// [`Error::InvalidRange`] for unsatisfiable or malformed ranges, which the
/// HTTP layer renders as an empty 416.
pub async fn respond(
    source: StreamSource,
    range_header: Option<&str>,
    settings: &ResponderSettings,
    cache: &AssetCache,
) -> Result<Response> {
    let range = parse_range(range_header, source.total_size)?;

    let (status, length, body) = match range {
        Some(range) => {
            let body = ranged_body(&source, &range, settings, cache).await?;
            (StatusCode::PARTIAL_CONTENT, range.length(), body)
        }
        None => {
            let file = tokio::fs::File::open(&source.path).await?;
            let stream = ReaderStream::with_capacity(file, settings.chunk_size);
            (StatusCode::OK, source.total_size, stream_body(stream))
        }
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, source.content_type.as_str())
        .header(header::CONTENT_LENGTH, length.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .header("X-Video-Original-Type", source.original_type.as_str());

    if let Some(range) = &range {
        builder = builder.header(header::CONTENT_RANGE, range.content_range());
    }
    let disposition = format!("inline; filename=\"{}\"", source.file_name);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }
    if let Some(metadata) = &source.metadata {
        if let Ok(value) = HeaderValue::from_str(&metadata.header_value()) {
            builder = builder.header("X-Video-Metadata", value);
        }
    }
    if let Some(cache_control) = &settings.cache_control {
        builder = builder.header(header::CACHE_CONTROL, cache_control.as_str());
    }

    // Bodies read eagerly are complete, so a derived file can go now.
    let body = match body {
        BodyKind::Stream(stream) => Body::from_stream(GuardedStream {
            inner: stream,
            _guard: source.derived,
        }),
        BodyKind::Bytes(bytes) => Body::from(bytes),
    };

    builder
        .body(body)
        .map_err(|e| Error::Internal(format!("failed to build response: {e}")))
}

type FileStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

enum BodyKind {
    Stream(FileStream),
    Bytes(Bytes),
}

fn stream_body<S>(stream: S) -> BodyKind
where
    S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
{
    BodyKind::Stream(Box::pin(stream))
}

async fn ranged_body(
    source: &StreamSource,
    range: &ByteRange,
    settings: &ResponderSettings,
    cache: &AssetCache,
) -> Result<BodyKind> {
    let start = range.start;
    let end = range.last_byte();
    let length = range.length();

    let cacheable = source
        .fingerprint
        .as_ref()
        .filter(|_| source.derived.is_none() && cache.accepts_chunk(length));

    if let Some(fingerprint) = cacheable {
        if let Some(bytes) = cache.chunk(fingerprint, start, end) {
            tracing::trace!(start, end, "Chunk cache hit");
            return Ok(BodyKind::Bytes(bytes));
        }

        let mut file = tokio::fs::File::open(&source.path).await?;
        file.seek(SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await?;
        let bytes = Bytes::from(buf);
        cache.store_chunk(fingerprint, start, end, bytes.clone());
        return Ok(BodyKind::Bytes(bytes));
    }

    let mut file = tokio::fs::File::open(&source.path).await?;
    file.seek(SeekFrom::Start(start)).await?;

    // Wrap in a Take to limit reads to exactly `length` bytes.
    let capacity = settings.chunk_size.min(length as usize).max(1);
    let stream = ReaderStream::with_capacity(file.take(length), capacity);
    Ok(stream_body(stream))
}

/// A body stream that owns the derived-file guard.
///
/// Dropping the stream (on completion or client disconnect) drops the guard,
/// which deletes the transcoded file.
struct GuardedStream {
    inner: FileStream,
    _guard: Option<DerivedFile>,
}

impl Stream for GuardedStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.as_mut().poll_next(cx);
        if let Poll::Ready(Some(Err(e))) = &polled {
            tracing::warn!(error = %e, "Read failed mid-stream; aborting response");
        }
        polled
    }
}
