//! opentv - program guide compiler, exporter and server.

/// Application configuration (TOML).
mod config;
/// HTTP surface.
mod server;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use opentv_guide::{Escaping, XmltvEncoder, encode_playlist, join_url};
use opentv_source::{GuideApiClient, GuideLoader, GuideRefresher, LoadedGuide, StaticGuideFiles};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use crate::config::{AppConfig, resolve_bind_addr, resolve_config_path};
use crate::server::AppState;

/// Version string including the git revision.
const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (rev:", env!("GIT_HASH"), ")");

/// User-Agent sent to the guide API.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Output target meaning standard output.
const STDOUT_TARGET: &str = "-";

/// CLI argument parser.
#[derive(Parser)]
#[command(name = "opentv", about, version = APP_VERSION)]
struct Cli {
    /// Override config directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Override the static guide data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the primary guide API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show what is airing now and next on every channel.
    Guide(GuideArgs),
    /// Write the M3U playlist.
    Playlist(PlaylistArgs),
    /// Write the XMLTV guide.
    Epg(EpgArgs),
    /// Serve the guide API, playlist, EPG and assets over HTTP.
    Serve(ServeArgs),
    /// Write a default config file.
    Init(InitArgs),
}

/// Arguments for the `guide` subcommand.
#[derive(clap::Args)]
struct GuideArgs {
    /// Evaluation instant (RFC 3339, default: now).
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

/// Arguments for the `playlist` subcommand.
#[derive(clap::Args)]
struct PlaylistArgs {
    /// Base URL for logo and EPG links (default: config `server.public_url`).
    #[arg(long)]
    base_url: Option<String>,

    /// Output file, or "-" for stdout.
    #[arg(long, short, default_value = STDOUT_TARGET)]
    output: PathBuf,
}

/// Arguments for the `epg` subcommand.
#[derive(clap::Args)]
struct EpgArgs {
    /// Base URL for channel icons (default: config `server.public_url`).
    #[arg(long)]
    base_url: Option<String>,

    /// Reference instant for program templates (RFC 3339, default: now).
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    /// Escape XML special characters in text and attributes.
    #[arg(long)]
    escape: bool,

    /// Output file, or "-" for stdout.
    #[arg(long, short, default_value = STDOUT_TARGET)]
    output: PathBuf,
}

/// Arguments for the `serve` subcommand.
#[derive(clap::Args)]
struct ServeArgs {
    /// Listen address (default: config `server.bind`; `PORT` overrides the port).
    #[arg(long)]
    bind: Option<String>,
}

/// Arguments for the `init` subcommand.
#[derive(clap::Args)]
struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    force: bool,
}

/// Loads the config and applies the global CLI overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = resolve_config_path(cli.dir.as_ref())?;
    let mut config = AppConfig::load(&path)?;

    if let Some(data_dir) = &cli.data_dir {
        config.source.data_dir.clone_from(data_dir);
    }
    if let Some(api_url) = &cli.api_url {
        config.source.api_url = Some(api_url.clone());
    }

    Ok(config)
}

/// Builds the guide loader: the HTTP API as primary when configured, the
/// static data directory as fallback.
///
/// # Errors
///
/// Returns an error if the API URL is invalid or the HTTP client fails to build.
fn build_loader(config: &AppConfig) -> Result<GuideLoader<GuideApiClient, StaticGuideFiles>> {
    let primary = config
        .source
        .api_url
        .as_deref()
        .map(|api_url| {
            let base_url =
                Url::parse(api_url).with_context(|| format!("invalid api_url {api_url}"))?;
            GuideApiClient::builder()
                .base_url(base_url)
                .user_agent(USER_AGENT)
                .build()
                .context("failed to build guide API client")
        })
        .transpose()?;

    Ok(GuideLoader::new(
        primary,
        StaticGuideFiles::new(&config.source.data_dir),
    ))
}

/// Loads the guide once, anchored at `reference`.
async fn load_guide(config: &AppConfig, reference: DateTime<Utc>) -> Result<LoadedGuide> {
    let guide = build_loader(config)?
        .load(reference)
        .await
        .context("failed to load guide")?;
    if guide.using_fallback {
        tracing::warn!(
            data_dir = %config.source.data_dir.display(),
            "Guide API unavailable, using static guide data"
        );
    }
    Ok(guide)
}

/// Writes a document to `output`, or to stdout for "-".
///
/// # Errors
///
/// Returns an error if the write fails.
fn write_document(output: &Path, document: &str) -> Result<()> {
    if output == Path::new(STDOUT_TARGET) {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(document.as_bytes())
            .and_then(|()| stdout.flush())
            .context("failed to write to stdout")?;
        return Ok(());
    }

    std::fs::write(output, document)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), bytes = document.len(), "Document written");
    Ok(())
}

/// Runs the `guide` subcommand.
///
/// # Errors
///
/// Returns an error if the guide cannot be loaded.
#[instrument(skip_all)]
async fn run_guide(args: &GuideArgs, config: &AppConfig) -> Result<()> {
    let at = args.at.unwrap_or_else(Utc::now);
    let loaded = load_guide(config, at).await?;
    let entries = loaded.guide(at);

    tracing::info!("Channel\t\tNow\t\t\tNext");
    for entry in &entries {
        tracing::info!(
            "{}\t\t{}\t\t\t{}",
            entry.channel.name,
            entry
                .current_program
                .as_ref()
                .map_or("-", |p| p.title.as_str()),
            entry
                .upcoming_programs
                .first()
                .map_or("-", |p| p.title.as_str()),
        );
    }
    tracing::info!("Total: {} channels at {}", entries.len(), at.to_rfc3339());

    Ok(())
}

/// Runs the `playlist` subcommand.
///
/// # Errors
///
/// Returns an error if the guide cannot be loaded or the output cannot be written.
#[instrument(skip_all)]
async fn run_playlist(args: &PlaylistArgs, config: &AppConfig) -> Result<()> {
    let loaded = load_guide(config, Utc::now()).await?;
    let base_url = args
        .base_url
        .as_deref()
        .unwrap_or(&config.server.public_url);

    let document = encode_playlist(
        &loaded.channels,
        base_url,
        &join_url(base_url, server::EPG_PATH),
    );
    write_document(&args.output, &document)
}

/// Runs the `epg` subcommand.
///
/// # Errors
///
/// Returns an error if the guide cannot be loaded or the output cannot be written.
#[instrument(skip_all)]
async fn run_epg(args: &EpgArgs, config: &AppConfig) -> Result<()> {
    let loaded = load_guide(config, args.at.unwrap_or_else(Utc::now)).await?;
    let base_url = args
        .base_url
        .as_deref()
        .unwrap_or(&config.server.public_url);
    let escaping = if args.escape {
        Escaping::Xml
    } else {
        Escaping::Verbatim
    };

    let document = XmltvEncoder::new()
        .generator_name(&config.epg.generator_name)
        .escaping(escaping)
        .encode(&loaded.channels, &loaded.programs_by_channel(), base_url);
    write_document(&args.output, &document)
}

/// Runs the `serve` subcommand.
///
/// # Errors
///
/// Returns an error if the listen address is invalid or the server fails.
#[instrument(skip_all)]
async fn run_serve(args: &ServeArgs, config: &AppConfig) -> Result<()> {
    let bind = args.bind.as_deref().unwrap_or(&config.server.bind);
    let port = std::env::var("PORT").ok();
    let addr = resolve_bind_addr(bind, port.as_deref())?;

    let refresher = GuideRefresher::from_loader(build_loader(config)?);
    let encoder = XmltvEncoder::new().generator_name(&config.epg.generator_name);
    let state = AppState::new(refresher, &config.server.public_url, encoder);

    tracing::info!(
        data_dir = %config.source.data_dir.display(),
        assets_dir = %config.server.assets_dir.display(),
        api_url = config.source.api_url.as_deref().unwrap_or("-"),
        "Starting guide server"
    );
    server::serve(addr, server::router(state, &config.server.assets_dir)).await
}

/// Runs the `init` subcommand.
///
/// # Errors
///
/// Returns an error if the config file exists (without `--force`) or cannot be written.
fn run_init(args: &InitArgs, dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::default().save(&path)?;
    tracing::info!(path = %path.display(), "Config written");
    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    match &cli.command {
        Commands::Guide(args) => run_guide(args, &load_config(&cli)?).await,
        Commands::Playlist(args) => run_playlist(args, &load_config(&cli)?).await,
        Commands::Epg(args) => run_epg(args, &load_config(&cli)?).await,
        Commands::Serve(args) => run_serve(args, &load_config(&cli)?).await,
        Commands::Init(args) => run_init(args, cli.dir.as_ref()),
    }
}
