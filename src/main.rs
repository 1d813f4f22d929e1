mod cli;

use vidforge::{config, server};
use vidforge_av::{FormatValidator, ToolRegistry};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    media_dir: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    config::ServerOverrides {
        host,
        port,
        media_dir,
    }
    .apply(&mut config)
    .context("Invalid command-line overrides")?;

    tracing::info!("Starting vidforge {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidforge=trace,vidforge_av=trace,vidforge_common=debug,tower_http=debug".to_string()
        } else {
            "vidforge=debug,vidforge_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            media_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, media_dir, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::CheckTools => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_tools(cli.config.as_deref()))
        }
        Commands::Validate { file } => {
            let path = file.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let validator = FormatValidator::from_tools(&tools, config.probe.timeout());

    let descriptor = validator.validate(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    println!("File: {}", descriptor.path.display());
    println!("Size: {} bytes", descriptor.size_bytes);
    println!("MIME type: {}", descriptor.mime_type);
    println!(
        "Served as: {}",
        if descriptor.is_supported_container {
            "original (MP4)"
        } else {
            "transcoded to MP4 when possible"
        }
    );

    match &descriptor.metadata {
        Some(meta) => {
            let secs = meta.duration_seconds as u64;
            let mins = secs / 60;
            let hours = mins / 60;
            println!("Video: {}x{} @ {:.3} fps", meta.width, meta.height, meta.frame_rate);
            println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
        }
        None => println!("Video: metadata unavailable"),
    }

    Ok(())
}

async fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all().await;
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Without ffprobe, metadata is omitted; without ffmpeg, non-MP4 assets are served unconverted.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Media dir: {}", config.server.media_dir.display());
            println!("  Temp dir: {}", config.server.temp_dir.display());
            println!("  Chunk size: {} bytes", config.streaming.chunk_size);
            println!("  Cache enabled: {}", config.cache.enabled);
            println!(
                "  Transcode: enabled={}, strict_mp4={}",
                config.transcode.enabled, config.transcode.strict_mp4
            );
            for warning in config.validate() {
                println!("  ! {}", warning);
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Media dir: {}", config.server.media_dir.display());
        }
    }

    Ok(())
}
