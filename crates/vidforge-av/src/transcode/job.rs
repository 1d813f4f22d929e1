//! Conversion job state and the derived-file guard.

use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// Lifecycle of a [`ConversionJob`].
///
/// A job starts `Pending`, moves to `Failed` each time a strategy errors
/// (and back to `Pending` for the next one), and ends `Succeeded` or
/// `Skipped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed(String),
    /// No rendition was produced; the source is served unchanged.
    Skipped,
}

/// One attempt to convert a source file into an ephemeral MP4.
///
/// The job owns its temporary output once one has been attached. Dropping a
/// job that never succeeded deletes whatever partial file ffmpeg left behind.
#[derive(Debug)]
pub struct ConversionJob {
    pub source_path: PathBuf,
    /// Set when the first strategy that writes output runs.
    pub target_path: Option<PathBuf>,
    /// Index of the strategy currently (or last) attempted.
    pub strategy_index: usize,
    pub status: JobStatus,
    output: Option<TempPath>,
}

impl ConversionJob {
    pub(crate) fn new(source_path: PathBuf) -> Self {
        Self {
            source_path,
            target_path: None,
            strategy_index: 0,
            status: JobStatus::Pending,
            output: None,
        }
    }

    /// Take ownership of the temp file strategies write into.
    pub(crate) fn attach_output(&mut self, output: TempPath) -> PathBuf {
        let path = output.to_path_buf();
        self.target_path = Some(path.clone());
        self.output = Some(output);
        path
    }

    pub(crate) fn begin(&mut self, strategy_index: usize) {
        self.strategy_index = strategy_index;
        self.status = JobStatus::Pending;
    }

    pub(crate) fn succeed(&mut self) {
        self.status = JobStatus::Succeeded;
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.status = JobStatus::Failed(reason.into());
    }

    /// Give up on conversion and delete the target right away.
    pub(crate) fn skip(&mut self) {
        self.status = JobStatus::Skipped;
        self.output = None;
    }

    pub fn is_converted(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Hand the converted file to the caller.
    ///
    /// Returns `None` unless the job succeeded.
    pub fn into_output(mut self) -> Option<DerivedFile> {
        if !self.is_converted() {
            return None;
        }
        self.output.take().map(|path| DerivedFile { path })
    }
}

/// An ephemeral transcoded file, deleted when this guard is dropped.
#[derive(Debug)]
pub struct DerivedFile {
    path: TempPath,
}

impl DerivedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DerivedFile {
    fn drop(&mut self) {
        // The TempPath field removes the file after this runs.
        tracing::debug!(path = %self.path.display(), "Removing derived file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_output(dir: &Path) -> TempPath {
        tempfile::Builder::new()
            .prefix("converted_")
            .suffix(".mp4")
            .tempfile_in(dir)
            .unwrap()
            .into_temp_path()
    }

    fn job_with_output(dir: &Path) -> ConversionJob {
        let mut job = ConversionJob::new("in.mkv".into());
        job.attach_output(temp_output(dir));
        job
    }

    #[test]
    fn only_succeeded_jobs_yield_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job_with_output(dir.path());
        job.fail("boom");
        assert_eq!(job.status, JobStatus::Failed("boom".into()));
        assert!(job.into_output().is_none());
    }

    #[test]
    fn dropping_failed_job_removes_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job_with_output(dir.path());
        let target = job.target_path.clone().unwrap();
        assert!(target.exists());
        job.fail("boom");
        drop(job);
        assert!(!target.exists());
    }

    #[test]
    fn skip_removes_target_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job_with_output(dir.path());
        let target = job.target_path.clone().unwrap();
        job.skip();
        assert!(!target.exists());
        assert_eq!(job.status, JobStatus::Skipped);
    }

    #[test]
    fn derived_file_lives_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job_with_output(dir.path());
        job.begin(1);
        job.succeed();
        assert_eq!(job.strategy_index, 1);

        let derived = job.into_output().unwrap();
        let path = derived.path().to_path_buf();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("converted_"));
        drop(derived);
        assert!(!path.exists());
    }

    #[test]
    fn succeeded_job_without_output_yields_nothing() {
        let mut job = ConversionJob::new("in.mkv".into());
        assert!(job.target_path.is_none());
        job.succeed();
        assert!(job.into_output().is_none());
    }
}
