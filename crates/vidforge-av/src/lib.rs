//! # vidforge-av
//!
//! Everything that touches media files or external tools:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- locate ffmpeg and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async process builder with a
//!   deadline; timed-out children are killed.
//! - **Probing** ([`FfprobeProber`]) -- video stream presence and metadata.
//! - **Detection** ([`detect`]) -- magic bytes, extension, then ffprobe.
//! - **Validation** ([`FormatValidator`]) -- builds an
//!   [`AssetDescriptor`](vidforge_common::AssetDescriptor) or rejects the file.
//! - **Transcoding** ([`Transcoder`]) -- ordered fallback conversion to MP4.

pub mod command;
pub mod detect;
pub mod probe;
pub mod tools;
pub mod transcode;
pub mod validate;

pub use command::{ToolCommand, ToolOutput};
pub use detect::{Detector, DetectorPipeline};
pub use probe::FfprobeProber;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use transcode::{ConversionJob, ConversionStrategy, DerivedFile, JobStatus, Transcoder};
pub use validate::FormatValidator;
