//! External tool discovery.
//!
//! The [`ToolRegistry`] resolves where ffmpeg and ffprobe live, either from
//! explicit config overrides or by searching `PATH`. Missing tools are simply
//! absent from the registry; callers degrade instead of failing at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vidforge_common::config::ToolsConfig;

use crate::command::ToolCommand;

/// Tools the registry knows how to discover.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Budget for a `-version` availability check.
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// A resolved external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output, if the tool answered.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool locations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools using config overrides, falling back to `PATH`.
    ///
    /// An override is used only if the file exists; otherwise [`which::which`]
    /// is consulted. Tools that are not found are omitted.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut registry = Self::empty();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        tool = name,
                        path = %p.display(),
                        "Configured tool path does not exist, searching PATH"
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            match resolved {
                Some(path) => {
                    tracing::debug!(tool = name, path = %path.display(), "Found tool");
                    registry = registry.with_tool(name, path);
                }
                None => tracing::debug!(tool = name, "Tool not found"),
            }
        }

        registry
    }

    /// A registry with no tools; every capability that needs one is off.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) a tool at an explicit path.
    pub fn with_tool(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(
            name.to_string(),
            ToolConfig {
                name: name.to_string(),
                path: path.into(),
            },
        );
        self
    }

    /// Path of a tool, if it was found.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.tools.get(name).map(|t| t.path.as_path())
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check every known tool and report availability and version.
    pub async fn check_all(&self) -> Vec<ToolInfo> {
        let mut infos = Vec::with_capacity(KNOWN_TOOLS.len());

        for &name in KNOWN_TOOLS {
            let info = match self.tools.get(name) {
                Some(cfg) => {
                    let version = detect_version(&cfg.path).await;
                    ToolInfo {
                        name: name.to_string(),
                        // A binary that cannot answer -version is unusable.
                        available: version.is_some(),
                        version,
                        path: Some(cfg.path.clone()),
                    }
                }
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            };
            infos.push(info);
        }

        infos
    }
}

/// Run `<tool> -version` and return the first line of stdout.
async fn detect_version(path: &Path) -> Option<String> {
    let output = ToolCommand::new(path)
        .arg("-version")
        .timeout(VERSION_CHECK_TIMEOUT)
        .execute()
        .await
        .ok()?;

    output.stdout.lines().next().map(|s| s.trim().to_string())
}
