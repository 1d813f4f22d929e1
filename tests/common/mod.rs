//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temporary media directory and a
//! temporary derivative directory plus a full [`AppContext`]. The
//! `with_server*` constructors start Axum on a random port for HTTP-level
//! testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vidforge::config::Config;
use vidforge::server::{create_router, AppContext};
use vidforge_av::ToolRegistry;

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub media: TempDir,
    pub temp: TempDir,
}

impl TestHarness {
    /// No external tools, default config.
    pub fn new() -> Self {
        Self::build(ToolRegistry::empty(), |_| {})
    }

    /// Custom tools and config tweaks. Media and temp dirs start out as
    /// fresh temporary directories; `configure` runs afterwards.
    pub fn build(tools: ToolRegistry, configure: impl FnOnce(&mut Config)) -> Self {
        let media = tempfile::tempdir().expect("failed to create media dir");
        let temp = tempfile::tempdir().expect("failed to create temp dir");

        let mut config = Config::default();
        config.server.media_dir = media.path().to_path_buf();
        config.server.temp_dir = temp.path().to_path_buf();
        configure(&mut config);

        let ctx = AppContext::new(config, tools);
        Self { ctx, media, temp }
    }

    /// Start an Axum server on a random port with default settings.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start an Axum server with custom tools and config.
    pub async fn with_server_config(
        tools: ToolRegistry,
        configure: impl FnOnce(&mut Config),
    ) -> (Self, SocketAddr) {
        Self::build(tools, configure).serve().await
    }

    async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Write a file into the media directory.
    pub fn add_media(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.media.path().join(name);
        std::fs::write(&path, bytes).expect("failed to write media file");
        path
    }

    /// Number of entries currently in the derivative directory.
    pub fn temp_entries(&self) -> usize {
        count_entries(self.temp.path())
    }
}

pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|r| r.count()).unwrap_or(0)
}

/// Bytes that sniff as MP4 (`ftyp isom`), padded to `len` with a pattern.
pub fn mp4_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&[0x00, 0x00, 0x02, 0x00]);
    let mut i = 0u32;
    while data.len() < len {
        data.push((i % 251) as u8);
        i += 1;
    }
    data.truncate(len);
    data
}

/// Bytes that sniff as Matroska (EBML header without a webm doctype).
pub fn mkv_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0x1A, 0x45, 0xDF, 0xA3, 0x42, 0x82, 0x88];
    data.extend_from_slice(b"matroska");
    while data.len() < len {
        data.push(0x5A);
    }
    data.truncate(len);
    data
}

/// Write an executable shell script, used to stand in for ffmpeg.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("failed to write script");
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
