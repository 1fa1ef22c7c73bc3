// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` reimport runner
//!
//! Opens scene files from a project as editor tabs, then reconciles them
//! against reimported definitions, either once (`--reimport`) or for every
//! batch of changes seen on disk (`--watch`).

use clap::Parser;
use ordoplay_scene_graph::ClassDb;
use ordoplay_scene_reimport::{
    ImportWorker, PreparedLoader, ReconcileReport, ReimportBatch, ReimportConfig, ReimportMonitor, Result,
    RonSceneLoader, TreeOutcome, Workspace,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Rebuild open scene instances after their definitions are reimported
#[derive(Parser, Debug)]
#[command(name = "ordoplay_reimport")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project directory
    #[arg(short = 'C', long, default_value = ".")]
    project_dir: PathBuf,

    /// Scene to open as a tab, relative to the project (default: every scene)
    #[arg(short, long = "scene")]
    scenes: Vec<PathBuf>,

    /// Definitions to reconcile once after opening
    #[arg(short, long, num_args = 1..)]
    reimport: Vec<PathBuf>,

    /// Keep running and reconcile every batch of changes
    #[arg(short, long)]
    watch: bool,

    /// Print a JSON summary of each reconciliation
    #[arg(long)]
    json: bool,

    /// Override the debounce window from `reimport.ron`
    #[arg(long)]
    debounce_ms: Option<u64>,
}

fn main() {
    let args = Args::parse();

    let mut config = match ReimportConfig::load_or_default(&args.project_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid settings: {e}");
            std::process::exit(2);
        }
    };
    if let Some(debounce_ms) = args.debounce_ms {
        config.debounce_ms = debounce_ms;
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay reimport v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        tracing::error!("Reimport failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args, config: ReimportConfig) -> Result<()> {
    let loader = RonSceneLoader::new(&args.project_dir);
    let mut workspace = Workspace::new(ClassDb::with_builtins(), config.clone());

    let scenes = if args.scenes.is_empty() {
        discover_scenes(&args.project_dir, &config)
    } else {
        args.scenes.clone()
    };
    for scene in &scenes {
        if let Err(e) = workspace.open_scene(&loader, scene) {
            tracing::error!("Could not open {:?}: {}", scene, e);
        }
    }
    tracing::info!("{} tab(s) open", workspace.tabs().len());

    let mut worker = ImportWorker::spawn(&args.project_dir)?;

    if !args.reimport.is_empty() {
        let batch = ReimportBatch::from_paths(&args.reimport, &config);
        for resource in &batch.resources {
            tracing::info!("Skipping non-scene resource {:?}", resource);
        }
        let report = reconcile_batch(&mut workspace, &mut worker, &loader, &batch.definitions)?;
        print_summary(args, &workspace, &report);
    }

    if !args.watch {
        return Ok(());
    }

    let mut monitor = ReimportMonitor::new(&args.project_dir, config);
    monitor.watch()?;
    loop {
        if let Some(batch) = monitor.poll() {
            for resource in &batch.resources {
                tracing::info!("Skipping non-scene resource {:?}", resource);
            }
            if batch.has_definitions() {
                let report = reconcile_batch(&mut workspace, &mut worker, &loader, &batch.definitions)?;
                monitor.record(&report);
                print_summary(args, &workspace, &report);
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Read the batch off-thread, then reconcile once every read has completed
fn reconcile_batch(
    workspace: &mut Workspace,
    worker: &mut ImportWorker,
    loader: &RonSceneLoader,
    definitions: &[PathBuf],
) -> Result<ReconcileReport> {
    for path in definitions {
        worker.request(path.clone())?;
    }
    let mut prepared = PreparedLoader::new(loader);
    prepared.absorb(worker.wait_all());
    Ok(workspace.reconcile(&prepared, definitions))
}

fn discover_scenes(project_dir: &Path, config: &ReimportConfig) -> Vec<PathBuf> {
    let mut scenes: Vec<PathBuf> = walkdir::WalkDir::new(project_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file() && config.is_scene_path(entry.path()))
        .filter_map(|entry| entry.path().strip_prefix(project_dir).ok().map(Path::to_path_buf))
        .collect();
    scenes.sort();
    scenes
}

fn print_summary(args: &Args, workspace: &Workspace, report: &ReconcileReport) {
    if !args.json {
        return;
    }
    let tabs: Vec<_> = workspace
        .tabs()
        .iter()
        .enumerate()
        .map(|(index, tab)| {
            let outcome = match report.outcome(index) {
                Some(TreeOutcome::Reconciled(r)) => serde_json::json!({
                    "status": "reconciled",
                    "replaced": r.replaced.len(),
                    "restored_properties": r.restored_properties,
                    "skipped_properties": r.skipped_properties,
                    "restored_connections": r.restored_connections,
                    "skipped_connections": r.skipped_connections,
                    "restored_additions": r.restored_additions,
                    "skipped_additions": r.skipped_additions,
                    "warnings": r.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
                }),
                Some(TreeOutcome::Failed(e)) => serde_json::json!({
                    "status": "failed",
                    "error": e.to_string(),
                }),
                None if report.reopened.contains(&index) => serde_json::json!({ "status": "reopened" }),
                None if report.failed_reopens.iter().any(|(i, _)| *i == index) => {
                    serde_json::json!({ "status": "reopen_failed" })
                }
                None => serde_json::json!({ "status": "unchanged" }),
            };
            serde_json::json!({
                "path": tab.path,
                "unsaved": tab.is_unsaved(),
                "outcome": outcome,
            })
        })
        .collect();

    let summary = serde_json::json!({
        "reconciled": report.reconciled(),
        "failed": report.failed(),
        "refreshed_nodes": report.refreshed_nodes,
        "tabs": tabs,
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::warn!("Could not print summary: {}", e),
    }
}
