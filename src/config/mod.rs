pub use vidforge_common::config::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default config locations, searched in order.
const DEFAULT_PATHS: &[&str] = &[
    "./vidforge.toml",
    "./config.toml",
    "~/.config/vidforge/config.toml",
    "/etc/vidforge/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    check_config(&config)?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Command-line overrides for the `[server]` section.
#[derive(Debug, Default)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub media_dir: Option<PathBuf>,
}

impl ServerOverrides {
    /// Apply the overrides, then re-run the checks the file went through.
    pub fn apply(self, config: &mut Config) -> Result<()> {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(media_dir) = self.media_dir {
            config.server.media_dir = media_dir;
        }
        check_config(config)
    }
}

/// Reject configurations the server cannot run with.
fn check_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.streaming.chunk_size == 0 {
        anyhow::bail!("streaming.chunk_size must be greater than 0");
    }

    if config.probe.timeout_secs == 0 {
        anyhow::bail!("probe.timeout_secs must be greater than 0");
    }

    if config.server.temp_dir == config.server.media_dir {
        anyhow::bail!("server.temp_dir must differ from server.media_dir");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.streaming.chunk_size, 10 * 1024 * 1024);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 9000
            media_dir = "/srv/media"

            [cache]
            enabled = false

            [transcode]
            strict_mp4 = true
            fallback_crf = 28
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.media_dir, std::path::PathBuf::from("/srv/media"));
        assert!(!config.cache.enabled);
        assert!(config.transcode.strict_mp4);
        assert_eq!(config.transcode.fallback_crf, 28);
        assert_eq!(config.transcode.fallback_preset, "medium");
    }

    #[test]
    fn port_zero_is_rejected() {
        let err = parse_config("[server]\nport = 0\n").unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(parse_config("[streaming]\nchunk_size = 0\n").is_err());
    }

    #[test]
    fn shared_media_and_temp_dir_is_rejected() {
        let toml = "[server]\nmedia_dir = \"/data\"\ntemp_dir = \"/data\"\n";
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"127.0.0.1\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_config_or_default(Some(Path::new("/nonexistent/vidforge.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn overrides_replace_server_fields() {
        let mut config = Config::default();
        ServerOverrides {
            host: Some("127.0.0.1".into()),
            port: Some(9090),
            media_dir: Some(PathBuf::from("/srv/videos")),
        }
        .apply(&mut config)
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.media_dir, PathBuf::from("/srv/videos"));
    }

    #[test]
    fn empty_overrides_keep_config() {
        let mut config = parse_config("[server]\nport = 7000\n").unwrap();
        ServerOverrides::default().apply(&mut config).unwrap();
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn zero_port_override_is_rejected() {
        let mut config = Config::default();
        let overrides = ServerOverrides {
            port: Some(0),
            ..ServerOverrides::default()
        };
        let err = overrides.apply(&mut config).unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn media_dir_override_matching_temp_dir_is_rejected() {
        let mut config = Config::default();
        let overrides = ServerOverrides {
            media_dir: Some(config.server.temp_dir.clone()),
            ..ServerOverrides::default()
        };
        assert!(overrides.apply(&mut config).is_err());
    }
}
