//! Asset streaming.
//!
//! # Routes
//!
//! - `GET /stream/:filename` - Validate, transcode if needed, and stream with
//!   HTTP range support

mod cache;
mod direct;
mod responder;

pub use cache::{start_cleanup_task, AssetCache, Fingerprint, TtlCache};
pub use direct::{secure_filename, stream_asset};
pub use responder::{respond, ResponderSettings, StreamSource};

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the streaming router.
pub fn stream_router() -> Router<AppContext> {
    Router::new().route("/:filename", get(stream_asset))
}
