//! Ferrocliff: matched-pair activity cliff analysis.
//! Entry point for the command-line binary.

mod cli;
mod report;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ferrocliff_chem::{FragmentEngine, SimilarityOracle};
use ferrocliff_cliffs::{CliffSession, ScanProgress};
use ferrocliff_common::{CliffConfig, CliffError};
use ferrocliff_ingestion::{read_csv, resolve_columns};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::report::{render_table, Report};

/// Drive a progress bar from the session's scan events until a scan finishes.
fn spawn_progress(mut rx: broadcast::Receiver<ScanProgress>, bar: ProgressBar) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    bar.set_length(event.total as u64);
                    bar.set_position(event.completed as u64);
                    if event.is_finished() {
                        bar.finish_and_clear();
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn progress_bar(hidden: bool) -> anyhow::Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    bar.set_message("Comparing pairs");
    Ok(bar)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ferrocliff=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    info!("Ferrocliff {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => CliffConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CliffConfig::load()?,
    };
    args.apply(&mut config);
    config.validate()?;

    let table = read_csv(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let columns = resolve_columns(&table, &config.columns)?;

    let engine = Arc::new(FragmentEngine::new(&config.fingerprint));
    let oracle = Arc::new(SimilarityOracle::new(engine).with_depiction(config.depiction.clone()));
    let session = CliffSession::new(oracle, config.analysis.clone());

    let bar = progress_bar(args.json)?;
    let reporter = spawn_progress(session.subscribe(), bar.clone());

    let loaded = match session.load(&table.rows, &columns).await {
        Ok(loaded) => {
            let _ = reporter.await;
            loaded
        }
        Err(e) => {
            reporter.abort();
            bar.finish_and_clear();
            return Err(e.into());
        }
    };
    let matched = session.pairs().await.len();

    if let Some(query) = &args.query {
        match session.search(query).await {
            Ok(_) => {}
            Err(CliffError::InvalidQuery(msg)) => {
                warn!(query = %query, "Invalid query, showing unfiltered pairs");
                eprintln!("Invalid query pattern: {msg}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let report = Report::new(
        session.id().to_string(),
        &loaded.summary,
        config.analysis.similarity_threshold,
        matched,
        session.displayed().await,
        config.analysis.display_limit,
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_table(&report));
    }
    Ok(())
}
