//! `GET /stream/:filename` -- validate, convert if needed, and stream.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, HeaderMap},
    response::Response,
};
use vidforge_common::{mime, AssetDescriptor, Error, MimeType, Result};

use super::cache::Fingerprint;
use super::responder::{self, StreamSource};
use crate::server::{AppContext, AppError};

/// Serve a media asset from the media directory with range support.
pub async fn stream_asset(
    State(ctx): State<AppContext>,
    UrlPath(filename): UrlPath<String>,
    headers: HeaderMap,
) -> std::result::Result<Response, AppError> {
    let name = secure_filename(&filename).ok_or_else(|| Error::not_found("asset", &filename))?;
    let path = ctx.config.server.media_dir.join(&name);

    // A non-UTF-8 Range header becomes "", which fails to parse as a range.
    let range_header = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    let (descriptor, fingerprint) = resolve_descriptor(&ctx, &path).await?;
    tracing::debug!(
        asset = %name,
        mime = %descriptor.mime_type,
        size = descriptor.size_bytes,
        range = ?range_header,
        "Streaming asset"
    );

    let source = if descriptor.is_supported_container {
        original_source(&descriptor, &name, fingerprint)
    } else {
        let job = ctx.transcoder.convert(&descriptor).await?;
        match job.into_output() {
            Some(derived) => {
                let total_size = tokio::fs::metadata(derived.path())
                    .await
                    .map_err(Error::from)?
                    .len();
                StreamSource {
                    path: derived.path().to_path_buf(),
                    total_size,
                    content_type: MimeType::new(mime::MP4),
                    original_type: descriptor.mime_type.clone(),
                    file_name: name.clone(),
                    metadata: descriptor.metadata.clone(),
                    fingerprint: None,
                    derived: Some(derived),
                }
            }
            None => original_source(&descriptor, &name, fingerprint),
        }
    };

    let response =
        responder::respond(source, range_header, &ctx.responder_settings(), &ctx.cache).await?;
    Ok(response)
}

fn original_source(
    descriptor: &AssetDescriptor,
    name: &str,
    fingerprint: Option<Fingerprint>,
) -> StreamSource {
    StreamSource {
        path: descriptor.path.clone(),
        total_size: descriptor.size_bytes,
        content_type: descriptor.mime_type.clone(),
        original_type: descriptor.mime_type.clone(),
        file_name: name.to_string(),
        metadata: descriptor.metadata.clone(),
        fingerprint,
        derived: None,
    }
}

/// Validate `path`, going through the descriptor cache.
async fn resolve_descriptor(
    ctx: &AppContext,
    path: &Path,
) -> Result<(Arc<AssetDescriptor>, Option<Fingerprint>)> {
    let fingerprint = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(Fingerprint::of(path, &meta)),
        _ => None,
    };

    if let Some(fp) = &fingerprint {
        if let Some(descriptor) = ctx.cache.descriptor(fp) {
            tracing::trace!(path = %path.display(), "Descriptor cache hit");
            return Ok((descriptor, fingerprint));
        }
    }

    let descriptor = Arc::new(ctx.validator.validate(path).await?);
    if let Some(fp) = &fingerprint {
        ctx.cache.store_descriptor(fp, Arc::clone(&descriptor));
    }
    Ok((descriptor, fingerprint))
}

/// Reduce a client-supplied name to a safe single path component.
///
/// Only the final component is kept. ASCII letters, digits, `.`, `_` and `-`
/// survive, whitespace becomes `_`, everything else is dropped, and leading
/// dots and underscores are stripped. Returns `None` if nothing is left.
pub fn secure_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = last
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
