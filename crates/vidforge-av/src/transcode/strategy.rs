//! Conversion strategies tried in order by the [`Transcoder`](super::Transcoder).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use vidforge_common::config::TranscodeConfig;
use vidforge_common::{Error, Result};

use crate::command::ToolCommand;

/// What a successful strategy did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// The target file now holds an MP4 rendition.
    Converted,
    /// Nothing was produced; serve the source as-is.
    Passthrough,
}

/// One way of producing an MP4 rendition of a source file.
#[async_trait]
pub trait ConversionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `attempt` writes to `target`. Strategies that don't are handed
    /// the source path as `target` and must leave it untouched.
    fn writes_target(&self) -> bool {
        true
    }

    /// Convert `source` into `target` within `timeout`.
    ///
    /// An `Err` means "try the next strategy"; it never aborts the chain.
    async fn attempt(
        &self,
        source: &Path,
        target: &Path,
        timeout: Duration,
    ) -> Result<StrategyOutcome>;
}

/// Re-encode with ffmpeg to H.264/AAC in an MP4 container.
#[derive(Debug, Clone)]
pub struct FfmpegStrategy {
    name: String,
    ffmpeg: PathBuf,
    video_codec: String,
    audio_codec: String,
    preset: Option<String>,
    crf: Option<u32>,
}

impl FfmpegStrategy {
    /// Plain codec re-encode with ffmpeg's default quality settings.
    pub fn primary(ffmpeg: impl Into<PathBuf>, config: &TranscodeConfig) -> Self {
        Self {
            name: "ffmpeg".into(),
            ffmpeg: ffmpeg.into(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            preset: None,
            crf: None,
        }
    }

    /// Re-encode with an explicit preset and constant rate factor.
    pub fn fallback(ffmpeg: impl Into<PathBuf>, config: &TranscodeConfig) -> Self {
        Self {
            name: "ffmpeg-preset".into(),
            ffmpeg: ffmpeg.into(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            preset: Some(config.fallback_preset.clone()),
            crf: Some(config.fallback_crf),
        }
    }

    pub fn build_command(&self, source: &Path, target: &Path, timeout: Duration) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.ffmpeg);
        cmd.timeout(timeout);
        cmd.args(["-y", "-loglevel", "error", "-i"]);
        cmd.path_arg(source);
        cmd.args(["-c:v", self.video_codec.as_str()]);
        if let Some(preset) = &self.preset {
            cmd.args(["-preset", preset.as_str()]);
        }
        if let Some(crf) = self.crf {
            cmd.args(["-crf".to_string(), crf.to_string()]);
        }
        cmd.args(["-c:a", self.audio_codec.as_str()]);
        cmd.args(["-movflags", "+faststart", "-f", "mp4"]);
        cmd.path_arg(target);
        cmd
    }
}

#[async_trait]
impl ConversionStrategy for FfmpegStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(
        &self,
        source: &Path,
        target: &Path,
        timeout: Duration,
    ) -> Result<StrategyOutcome> {
        self.build_command(source, target, timeout).execute().await?;

        let written = tokio::fs::metadata(target).await?.len();
        if written == 0 {
            return Err(Error::ConversionFailure(format!(
                "{} produced an empty file",
                self.name
            )));
        }

        Ok(StrategyOutcome::Converted)
    }
}

/// Always succeeds without producing output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

#[async_trait]
impl ConversionStrategy for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn writes_target(&self) -> bool {
        false
    }

    async fn attempt(
        &self,
        _source: &Path,
        _target: &Path,
        _timeout: Duration,
    ) -> Result<StrategyOutcome> {
        Ok(StrategyOutcome::Passthrough)
    }
}
