//! Fallback transcoding of non-MP4 assets into ephemeral MP4 files.
//!
//! The [`Transcoder`] runs an ordered list of [`ConversionStrategy`]s into a
//! `converted_*.mp4` temp file. The first strategy to succeed wins. When every
//! strategy fails the asset is served unconverted, unless `strict_mp4` is set,
//! in which case the request fails with [`Error::ConversionFailure`].

mod job;
mod strategy;

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use vidforge_common::config::TranscodeConfig;
use vidforge_common::{AssetDescriptor, Error, Result};

use crate::tools::ToolRegistry;

pub use job::{ConversionJob, DerivedFile, JobStatus};
pub use strategy::{ConversionStrategy, FfmpegStrategy, Passthrough, StrategyOutcome};

/// Prefix of every derived file in the temp directory.
pub const DERIVED_PREFIX: &str = "converted_";

pub struct Transcoder {
    strategies: Vec<Box<dyn ConversionStrategy>>,
    temp_dir: PathBuf,
    config: TranscodeConfig,
}

impl Transcoder {
    pub fn new(
        strategies: Vec<Box<dyn ConversionStrategy>>,
        temp_dir: impl Into<PathBuf>,
        config: TranscodeConfig,
    ) -> Self {
        Self {
            strategies,
            temp_dir: temp_dir.into(),
            config,
        }
    }

    /// Build the standard chain: ffmpeg, ffmpeg with preset/CRF, then
    /// passthrough (omitted under `strict_mp4`).
    pub fn from_tools(
        tools: &ToolRegistry,
        config: &TranscodeConfig,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut strategies: Vec<Box<dyn ConversionStrategy>> = Vec::new();

        match (config.enabled, tools.get("ffmpeg")) {
            (true, Some(ffmpeg)) => {
                strategies.push(Box::new(FfmpegStrategy::primary(ffmpeg, config)));
                strategies.push(Box::new(FfmpegStrategy::fallback(ffmpeg, config)));
            }
            (true, None) => {
                tracing::warn!("ffmpeg not available; non-MP4 assets will not be converted");
            }
            (false, _) => tracing::info!("Transcoding disabled by configuration"),
        }

        if !config.strict_mp4 {
            strategies.push(Box::new(Passthrough));
        }

        Self::new(strategies, temp_dir, config.clone())
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Convert `asset` to MP4.
    ///
    /// On success the returned job is either `Succeeded` (take the file with
    /// [`ConversionJob::into_output`]) or `Skipped` (serve the source). The
    /// temp target is only created once a strategy that writes output runs;
    /// failing to create it counts as that strategy failing.
    ///
    /// # Errors
    ///
    /// [`Error::ConversionFailure`] when every strategy failed under
    /// `strict_mp4`.
    pub async fn convert(&self, asset: &AssetDescriptor) -> Result<ConversionJob> {
        let timeout = self.config.timeout_for(asset.size_bytes);
        let mut job = ConversionJob::new(asset.path.clone());
        let mut last_error: Option<String> = None;

        for (index, strategy) in self.strategies.iter().enumerate() {
            job.begin(index);

            let target = if !strategy.writes_target() {
                job.source_path.clone()
            } else if let Some(target) = &job.target_path {
                target.clone()
            } else {
                match self.create_target().await {
                    Ok(output) => job.attach_output(output),
                    Err(e) => {
                        tracing::warn!(
                            strategy = strategy.name(),
                            temp_dir = %self.temp_dir.display(),
                            error = %e,
                            "Cannot create conversion target"
                        );
                        job.fail(e.to_string());
                        last_error = Some(e.to_string());
                        continue;
                    }
                }
            };

            tracing::info!(
                strategy = strategy.name(),
                source = %job.source_path.display(),
                mime = %asset.mime_type,
                ?timeout,
                "Attempting conversion"
            );

            match strategy.attempt(&job.source_path, &target, timeout).await {
                Ok(StrategyOutcome::Converted) => {
                    job.succeed();
                    tracing::info!(
                        strategy = strategy.name(),
                        target = %target.display(),
                        "Conversion succeeded"
                    );
                    return Ok(job);
                }
                Ok(StrategyOutcome::Passthrough) if self.config.strict_mp4 => {
                    let reason = format!("{} is not permitted under strict_mp4", strategy.name());
                    tracing::warn!(strategy = strategy.name(), "{reason}");
                    job.fail(reason.clone());
                    last_error = Some(reason);
                }
                Ok(StrategyOutcome::Passthrough) => {
                    tracing::warn!(
                        source = %job.source_path.display(),
                        "Serving original file without conversion"
                    );
                    job.skip();
                    return Ok(job);
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        "Conversion strategy failed"
                    );
                    job.fail(e.to_string());
                    last_error = Some(e.to_string());
                }
            }
        }

        let reason = last_error.unwrap_or_else(|| "no conversion strategies available".into());
        tracing::error!(
            source = %job.source_path.display(),
            attempts = self.strategies.len(),
            error = %reason,
            "All conversion strategies exhausted"
        );

        if self.config.strict_mp4 {
            return Err(Error::ConversionFailure(format!(
                "{}: {reason}",
                job.source_path.display()
            )));
        }

        job.skip();
        Ok(job)
    }

    async fn create_target(&self) -> Result<TempPath> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let output = tempfile::Builder::new()
            .prefix(DERIVED_PREFIX)
            .suffix(".mp4")
            .tempfile_in(&self.temp_dir)?
            .into_temp_path();
        Ok(output)
    }
}

impl std::fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("strategies", &self.strategy_names())
            .field("temp_dir", &self.temp_dir)
            .field("strict_mp4", &self.config.strict_mp4)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use vidforge_common::{mime, MimeType};

    /// Fails, or writes a few bytes to the target.
    struct Scripted {
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ConversionStrategy for Scripted {
        fn name(&self) -> &str {
            if self.succeed { "ok" } else { "broken" }
        }

        async fn attempt(
            &self,
            _source: &Path,
            target: &Path,
            _timeout: Duration,
        ) -> Result<StrategyOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                tokio::fs::write(target, b"mp4 bytes").await?;
                Ok(StrategyOutcome::Converted)
            } else {
                Err(Error::tool("ffmpeg", "exited with status 1"))
            }
        }
    }

    fn scripted(succeed: bool, calls: &Arc<AtomicUsize>) -> Box<dyn ConversionStrategy> {
        Box::new(Scripted {
            succeed,
            calls: Arc::clone(calls),
        })
    }

    fn mkv_asset() -> AssetDescriptor {
        AssetDescriptor::new("/media/in.mkv".into(), 2048, MimeType::new(mime::MATROSKA), None)
    }

    fn temp_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|r| r.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn first_successful_strategy_wins() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let transcoder = Transcoder::new(
            vec![scripted(false, &calls), scripted(true, &calls), scripted(true, &calls)],
            dir.path(),
            TranscodeConfig::default(),
        );

        let job = transcoder.convert(&mkv_asset()).await.unwrap();
        assert!(job.is_converted());
        assert_eq!(job.strategy_index, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let derived = job.into_output().unwrap();
        assert_eq!(std::fs::read(derived.path()).unwrap(), b"mp4 bytes");
        drop(derived);
        assert_eq!(temp_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn exhaustion_falls_back_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let transcoder = Transcoder::new(
            vec![scripted(false, &calls), scripted(false, &calls)],
            dir.path(),
            TranscodeConfig::default(),
        );

        let job = transcoder.convert(&mkv_asset()).await.unwrap();
        assert_eq!(job.status, JobStatus::Skipped);
        assert!(job.into_output().is_none());
        assert_eq!(temp_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn exhaustion_under_strict_mp4_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let config = TranscodeConfig {
            strict_mp4: true,
            ..TranscodeConfig::default()
        };
        let transcoder = Transcoder::new(
            vec![scripted(false, &calls), Box::new(Passthrough)],
            dir.path(),
            config,
        );

        let err = transcoder.convert(&mkv_asset()).await.unwrap_err();
        assert!(matches!(err, Error::ConversionFailure(_)));
        assert_eq!(err.http_status(), 502);
        assert_eq!(temp_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn passthrough_skips_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let transcoder = Transcoder::new(
            vec![Box::new(Passthrough), scripted(true, &calls)],
            dir.path(),
            TranscodeConfig::default(),
        );

        let job = transcoder.convert(&mkv_asset()).await.unwrap();
        assert_eq!(job.status, JobStatus::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unwritable_temp_dir_falls_through_to_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let transcoder = Transcoder::new(
            vec![scripted(true, &calls), Box::new(Passthrough)],
            &blocker,
            TranscodeConfig::default(),
        );

        let job = transcoder.convert(&mkv_asset()).await.unwrap();
        assert_eq!(job.status, JobStatus::Skipped);
        assert!(job.target_path.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passthrough_only_chain_never_touches_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("derived");
        let transcoder =
            Transcoder::new(vec![Box::new(Passthrough)], &temp, TranscodeConfig::default());

        let job = transcoder.convert(&mkv_asset()).await.unwrap();
        assert_eq!(job.status, JobStatus::Skipped);
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn unwritable_temp_dir_under_strict_mp4_is_a_conversion_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let config = TranscodeConfig {
            strict_mp4: true,
            ..TranscodeConfig::default()
        };
        let transcoder = Transcoder::new(vec![scripted(true, &calls)], &blocker, config);

        let err = transcoder.convert(&mkv_asset()).await.unwrap_err();
        assert!(matches!(err, Error::ConversionFailure(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn from_tools_without_ffmpeg_only_passes_through() {
        let transcoder =
            Transcoder::from_tools(&ToolRegistry::empty(), &TranscodeConfig::default(), "/tmp");
        assert_eq!(transcoder.strategy_names(), vec!["passthrough"]);
    }

    #[test]
    fn from_tools_builds_full_chain() {
        let tools = ToolRegistry::empty().with_tool("ffmpeg", "/usr/bin/ffmpeg");
        let transcoder = Transcoder::from_tools(&tools, &TranscodeConfig::default(), "/tmp");
        assert_eq!(
            transcoder.strategy_names(),
            vec!["ffmpeg", "ffmpeg-preset", "passthrough"]
        );

        let strict = TranscodeConfig {
            strict_mp4: true,
            ..TranscodeConfig::default()
        };
        let transcoder = Transcoder::from_tools(&tools, &strict, "/tmp");
        assert_eq!(transcoder.strategy_names(), vec!["ffmpeg", "ffmpeg-preset"]);
    }
}
