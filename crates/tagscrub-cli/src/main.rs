// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tagscrub_application::{
    album_kind, build_pipeline, AlbumKind, ImportMode, LoftyTagStore, PipelineError, ProgressEvent, ScrubSession,
    SessionError,
};
use tagscrub_config::{load as load_config, AppConfig, TelemetryConfig};
use tagscrub_domain::{Item, QueryResult};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tagscrub")]
#[command(about = "Identify and repair noisy artist/album/title tags in a music collection.")]
struct Cli {
    /// TOML configuration file (environment variables prefixed TAGSCRUB_ override it)
    #[arg(long, global = true, env = "TAGSCRUB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a directory and save the items found to a session document
    Scan(ScanArgs),

    /// Identify the items of a session document, or of a freshly scanned directory
    Identify(IdentifyArgs),

    /// Write clean tags for every item whose fields changed
    Write(SessionArgs),

    /// Move files into one directory per artist
    Organize(OrganizeArgs),
}

#[derive(Parser, Debug)]
struct ScanArgs {
    /// Directory to scan recursively
    root: PathBuf,

    /// Keep only files whose artist tag contains this text (case and spaces ignored)
    #[arg(long)]
    only_artist: Option<String>,

    /// Session document to write
    #[arg(short, long, default_value = "tagscrub-session.xml")]
    output: PathBuf,
}

#[derive(Parser, Debug)]
struct IdentifyArgs {
    /// Session document to identify
    #[arg(short, long, conflicts_with = "root")]
    input: Option<PathBuf>,

    /// Scan this directory instead of reading a session document
    #[arg(long)]
    root: Option<PathBuf>,

    /// Keep only files whose artist tag contains this text (with --root)
    #[arg(long, requires = "root")]
    only_artist: Option<String>,

    /// Treat previously cleaned values as the originals (with --input)
    #[arg(long, requires = "input")]
    reseed: bool,

    /// Session document to write the results to
    #[arg(short, long, default_value = "tagscrub-session.xml")]
    output: PathBuf,
}

#[derive(Parser, Debug)]
struct SessionArgs {
    /// Session document produced by `identify`
    #[arg(short, long, default_value = "tagscrub-session.xml")]
    input: PathBuf,
}

#[derive(Parser, Debug)]
struct OrganizeArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Destination root; files land in <dest>/<artist>/
    #[arg(long)]
    dest: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.telemetry);

    let session = ScrubSession::new(Arc::new(LoftyTagStore), config.scan.clone());

    match cli.cmd {
        Command::Scan(args) => scan(&session, &args).await,
        Command::Identify(args) => identify(session, &config, &args).await,
        Command::Write(args) => write(&session, &args).await,
        Command::Organize(args) => organize(&session, &args).await,
    }
}

fn init_tracing(telemetry: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));

    if telemetry.json {
        let fmt_layer = fmt::layer().json().with_target(true).with_level(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer().with_target(true).with_thread_names(true).with_level(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

async fn scan(session: &ScrubSession, args: &ScanArgs) -> Result<()> {
    let found = session
        .find(&args.root, args.only_artist.as_deref())
        .await
        .with_context(|| format!("failed to scan {}", args.root.display()))?;
    session.export(&args.output).await?;
    info!(target: "cli", found, output = %args.output.display(), "scan complete");
    Ok(())
}

async fn identify(session: ScrubSession, config: &AppConfig, args: &IdentifyArgs) -> Result<()> {
    match (&args.input, &args.root) {
        (Some(input), _) => {
            let mode = if args.reseed {
                ImportMode::CleanAsOriginal
            } else {
                ImportMode::Verbatim
            };
            load_session(&session, input, mode).await?;
        }
        (None, Some(root)) => {
            session.find(root, args.only_artist.as_deref()).await?;
        }
        (None, None) => anyhow::bail!("either --input or --root is required"),
    }

    let pipeline = build_pipeline(config)?;
    let cancel = CancellationToken::new();
    let _signal_handle = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let worker = {
        let session = session.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut progress = |event: ProgressEvent| {
                info!(
                    target: "cli",
                    pass = event.pass,
                    index = event.index,
                    total = event.total,
                    "{}",
                    event.message
                );
            };
            session.identify(&pipeline, &mut progress, &cancel).await
        })
    };

    let outcome = worker.await.context("identification task panicked")?;
    session.export(&args.output).await?;

    match outcome {
        Ok(summary) => {
            info!(
                target: "cli",
                items = summary.items,
                fields_changed = summary.fields_changed,
                no_guess = summary.no_guess,
                network_errors = summary.network_errors,
                output = %args.output.display(),
                "identification complete"
            );
            let kinds = count_album_kinds(&session.snapshot().await);
            info!(target: "cli", normal = kinds.normal, live = kinds.live, hits = kinds.hits, "identified albums by kind");
            Ok(())
        }
        Err(SessionError::Pipeline(PipelineError::Cancelled)) => {
            warn!(target: "cli", output = %args.output.display(), "identification cancelled; partial results saved");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct AlbumKindCounts {
    normal: usize,
    live: usize,
    hits: usize,
}

fn count_album_kinds(items: &[Item]) -> AlbumKindCounts {
    let mut counts = AlbumKindCounts::default();
    for item in items.iter().filter(|item| item.result == QueryResult::FieldsChanged) {
        match album_kind(&item.clean.album) {
            AlbumKind::Normal => counts.normal += 1,
            AlbumKind::Live => counts.live += 1,
            AlbumKind::Hits => counts.hits += 1,
        }
    }
    counts
}

async fn write(session: &ScrubSession, args: &SessionArgs) -> Result<()> {
    load_session(session, &args.input, ImportMode::Verbatim).await?;
    let summary = session.write().await?;
    info!(
        target: "cli",
        written = summary.written,
        skipped = summary.skipped,
        missing = summary.missing,
        failed = summary.failed,
        "write complete"
    );
    Ok(())
}

async fn organize(session: &ScrubSession, args: &OrganizeArgs) -> Result<()> {
    load_session(session, &args.session.input, ImportMode::Verbatim).await?;
    let summary = session.organize(&args.dest).await;
    // Paths changed; keep the session document pointing at the moved files.
    session.export(&args.session.input).await?;
    info!(
        target: "cli",
        moved = summary.moved,
        skipped_duplicates = summary.skipped_duplicates,
        failed = summary.failed,
        "organize complete"
    );
    Ok(())
}

async fn load_session(session: &ScrubSession, input: &Path, mode: ImportMode) -> Result<usize> {
    session
        .import(input, mode)
        .await
        .with_context(|| format!("failed to load session document {}", input.display()))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!(target: "cli", "interrupt received; stopping after the current item");
            cancel.cancel();
        }
        Err(err) => warn!(target: "cli", error = %err, "failed to install interrupt handler"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scan_with_filter() {
        let cli = Cli::try_parse_from(["tagscrub", "scan", "/music", "--only-artist", "ozzy"]).unwrap();
        match cli.cmd {
            Command::Scan(args) => {
                assert_eq!(args.root, PathBuf::from("/music"));
                assert_eq!(args.only_artist.as_deref(), Some("ozzy"));
                assert_eq!(args.output, PathBuf::from("tagscrub-session.xml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn identify_rejects_input_with_root() {
        let result = Cli::try_parse_from(["tagscrub", "identify", "--input", "a.xml", "--root", "/music"]);
        assert!(result.is_err());
    }

    #[test]
    fn reseed_requires_input() {
        assert!(Cli::try_parse_from(["tagscrub", "identify", "--root", "/music", "--reseed"]).is_err());
        assert!(Cli::try_parse_from(["tagscrub", "identify", "--input", "a.xml", "--reseed"]).is_ok());
    }

    #[test]
    fn counts_album_kinds_of_changed_items() {
        let mut items = Vec::new();
        for (album, result) in [
            ("Blizzard of Ozz", QueryResult::FieldsChanged),
            ("Live at Budokan", QueryResult::FieldsChanged),
            ("The Essential Greatest Hits", QueryResult::FieldsChanged),
            ("Tribute", QueryResult::NoGuess),
        ] {
            let mut item = Item::new(format!("/music/{album}.mp3"), Default::default());
            item.clean.album = album.to_string();
            item.result = result;
            items.push(item);
        }

        assert_eq!(
            count_album_kinds(&items),
            AlbumKindCounts {
                normal: 1,
                live: 1,
                hits: 1
            }
        );
    }

    #[test]
    fn organize_needs_destination() {
        assert!(Cli::try_parse_from(["tagscrub", "organize"]).is_err());
        let cli = Cli::try_parse_from(["tagscrub", "--config", "t.toml", "organize", "--dest", "/sorted"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
    }
}
