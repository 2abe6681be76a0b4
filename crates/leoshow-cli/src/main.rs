use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use leoshow_core::{FsStore, IngestError, IngestionPipeline, ShowConfig, Source, StylesheetRef};
use serde_json::json;

/// Thin shell around the ingestion core: hands it a staged upload or a
/// remote locator and renders the returned name or error string.
#[derive(Parser)]
#[command(
    name = "leoshow",
    version,
    about = "Bounded temp store for browser-rendered Leo outlines"
)]
struct ShowCli {
    /// Root directory of the artifact store. Defaults to ./tmp.
    #[arg(long, global = true, env = "LEOSHOW_STORE_DIR", value_name = "DIR")]
    store_dir: Option<PathBuf>,

    /// Inject the absolute stylesheet reference instead of the root-relative one.
    #[arg(long, global = true, env = "LEOSHOW_ABSOLUTE_XSL")]
    absolute_xsl: bool,

    /// Emit machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document and print the allocated artifact name.
    Ingest(IngestArgs),
    /// Run the two-phase store sweep and print what it reclaimed.
    Gc,
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true)))]
struct IngestArgs {
    /// Already-staged local upload to ingest.
    #[arg(long, group = "source", value_name = "PATH")]
    file: Option<PathBuf>,

    /// Remote locator for the document; must end in .leo.
    #[arg(long, group = "source", value_name = "URL")]
    url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = ShowCli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli).map_err(|err| eyre!("{err:?}"))?;
    let store = FsStore::new(config.store_root.clone())
        .map_err(|err| eyre!("cannot open store directory: {err}"))?;
    let pipeline = IngestionPipeline::new(store, config);

    let code = match &cli.command {
        Command::Ingest(args) => run_ingest(&cli, args, &pipeline),
        Command::Gc => run_gc(&cli, &pipeline),
    };

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Logs go to stderr; stdout carries only the artifact name or JSON.
    let filter = format!("leoshow_core={level},leoshow_cli={level},leoshow={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn build_config(cli: &ShowCli) -> anyhow::Result<ShowConfig> {
    let root = match &cli.store_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .context("cannot resolve the working directory")?
            .join("tmp"),
    };
    let mut config = ShowConfig::new(root);
    if cli.absolute_xsl {
        config.stylesheet = StylesheetRef::Absolute;
    }
    Ok(config)
}

fn run_ingest(cli: &ShowCli, args: &IngestArgs, pipeline: &IngestionPipeline<FsStore>) -> i32 {
    let source = match (&args.file, &args.url) {
        (Some(path), _) => Source::Staged(path.clone()),
        (None, Some(url)) => Source::Remote(url.clone()),
        (None, None) => {
            // Unreachable: clap requires exactly one source argument.
            eprintln!("either --file or --url is required");
            return 2;
        }
    };

    match pipeline.ingest(&source) {
        Ok(name) => {
            if cli.json {
                println!("{}", json!({ "name": name }));
            } else {
                println!("{name}");
            }
            0
        }
        Err(err) => emit_error(cli, &err),
    }
}

fn run_gc(cli: &ShowCli, pipeline: &IngestionPipeline<FsStore>) -> i32 {
    match pipeline.sweep() {
        Ok(summary) => {
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "scanned": summary.scanned,
                        "reclaimed": summary.reclaimed,
                        "reclaimed_bytes": summary.reclaimed_bytes,
                    })
                );
            } else {
                println!(
                    "scanned {} entries, reclaimed {} ({} bytes)",
                    summary.scanned, summary.reclaimed, summary.reclaimed_bytes
                );
            }
            0
        }
        Err(err) => emit_error(cli, &err),
    }
}

fn emit_error(cli: &ShowCli, err: &IngestError) -> i32 {
    let kind = err.kind();
    if cli.json {
        println!(
            "{}",
            json!({ "error": kind.as_str(), "message": err.to_string() })
        );
    } else {
        eprintln!("{err}");
    }
    if kind.is_user_error() {
        1
    } else {
        2
    }
}
