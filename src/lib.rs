pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod ingest;
pub mod io_utils;
pub mod merge;
pub mod session;
pub mod shell;
pub mod summary;
pub mod table;

use std::{
    env,
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::Settings,
    dashboard::{Dashboard, Page, Upload, Uploads},
    error::Source,
    shell::Shell,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("product_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Shell(args) => handle_shell(&args),
        Commands::Merge(args) => handle_merge(&args),
        Commands::Summary(args) => handle_summary(&args),
        Commands::Page(args) => handle_page(&args),
    }
}

fn handle_shell(args: &cli::ShellArgs) -> Result<()> {
    let settings = Settings::resolve(&args.settings)?;
    log_settings(&settings);
    let mut shell = Shell::new(Dashboard::new(settings));
    for (slot, path) in upload_paths(&args.uploads) {
        shell
            .upload(slot, path)
            .with_context(|| format!("Preloading upload {}", slot.ordinal()))?;
    }
    let stdin = io::stdin();
    shell.run(stdin.lock(), io::stdout().lock())
}

fn handle_merge(args: &cli::MergeArgs) -> Result<()> {
    let settings = Settings::resolve(&args.settings)?;
    log_settings(&settings);
    let (first, second) = load_pair(&args.first, &args.second)?;
    let mut dashboard = Dashboard::new(settings);
    let session = dashboard.open_session();
    let merged = dashboard
        .merge_uploads(session, &first, &second)
        .map_err(|err| anyhow!(err.user_message()))?;

    let delimiter = args
        .output_delimiter
        .unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)?;
    writer
        .write_record(merged.headers())
        .context("Writing merged headers")?;
    for row in merged.display_rows(None) {
        writer.write_record(&row).context("Writing merged row")?;
    }
    writer.flush().context("Flushing merged output")?;
    info!(
        "Wrote {} merged row(s) with columns [{}]",
        merged.row_count(),
        merged.headers().iter().join(", ")
    );
    Ok(())
}

fn handle_summary(args: &cli::SummaryArgs) -> Result<()> {
    let settings = Settings::resolve(&args.settings)?;
    log_settings(&settings);
    let (first, second) = load_pair(&args.first, &args.second)?;
    let mut dashboard = Dashboard::new(settings);
    let session = dashboard.open_session();
    let uploads = Uploads {
        first: Some(first),
        second: Some(second),
    };

    let ingestion = dashboard.evaluate(session, Page::Ingestion, &uploads);
    if let Some(message) = ingestion.errors().next() {
        return Err(anyhow!(message.to_string()));
    }

    let mut stdout = io::stdout().lock();
    if args.json {
        let summary = dashboard
            .summary(session)
            .map_err(|notice| anyhow!(notice.to_string()))?;
        serde_json::to_writer_pretty(&mut stdout, &summary).context("Writing summary JSON")?;
        writeln!(stdout)?;
    } else {
        let view = dashboard.evaluate(session, Page::Summary, &uploads);
        write!(stdout, "{}", view.render()).context("Writing summary page")?;
    }
    Ok(())
}

fn handle_page(args: &cli::PageArgs) -> Result<()> {
    let settings = Settings::resolve(&args.settings)?;
    let mut dashboard = Dashboard::new(settings);
    let session = dashboard.open_session();
    let mut uploads = Uploads::default();
    for (slot, path) in upload_paths(&args.uploads) {
        *uploads.slot_mut(slot) = Some(load_upload(path)?);
    }
    // The summary page reads what the ingestion page stored.
    if args.page == Page::Summary {
        let ingestion = dashboard.evaluate(session, Page::Ingestion, &uploads);
        if let Some(message) = ingestion.errors().next() {
            return Err(anyhow!(message.to_string()));
        }
    }
    let view = dashboard.evaluate(session, args.page, &uploads);
    print!("{}", view.render());
    Ok(())
}

fn upload_paths(args: &cli::UploadArgs) -> impl Iterator<Item = (Source, &Path)> {
    [
        (Source::First, args.first.as_deref()),
        (Source::Second, args.second.as_deref()),
    ]
    .into_iter()
    .filter_map(|(slot, path)| path.map(|p| (slot, p)))
}

fn load_upload(path: &Path) -> Result<Upload> {
    Ok(Upload::new(path, io_utils::read_upload(path)?))
}

fn load_pair(first: &Path, second: &Path) -> Result<(Upload, Upload)> {
    if io_utils::is_dash(first) && io_utils::is_dash(second) {
        return Err(anyhow!(
            "Only one upload can be read from stdin; provide a file path for the other"
        ));
    }
    Ok((load_upload(first)?, load_upload(second)?))
}

fn log_settings(settings: &Settings) {
    info!(
        "Merging on '{}' with suffixes '{}'/'{}', summing '{}'",
        settings.merge.key, settings.merge.suffixes.0, settings.merge.suffixes.1, settings.value_column
    );
}
