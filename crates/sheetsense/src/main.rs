use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::info;
use tracing_subscriber::EnvFilter;

use sheetsense::ai::ChatCompletionClient;
use sheetsense::codegen::ExternalToolSynthesizer;
use sheetsense::db::Database;
use sheetsense::pipeline::{Analyzer, PipelineConfig};
use sheetsense::worker::{
    AnalysisScheduler, AsyncFolderWatcher, DescriptorSet, DirectoryScanner, WatchController,
};
use sheetsense::{CodeSynthesizer, CompletionService, ConfigError};

#[derive(Parser)]
#[command(
    name = "sheetsense",
    version,
    about = "Watches a datasheet folder and analyzes new documents"
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "sheetsense.json")]
    config: PathBuf,

    /// Analyze pending files once and exit instead of running the service.
    #[arg(long)]
    once: bool,
}

fn main() -> sheetsense::Result<()> {
    // Route `log` records through tracing so one subscriber sees both.
    let _ = tracing_log::LogTracer::init();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = sheetsense::load_config(&cli.config)?;

    info!("Starting sheetsense v{}", env!("CARGO_PKG_VERSION"));

    let database_path = config
        .database_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(sheetsense::db::default_database_path)
        .ok_or_else(|| ConfigError::Validation {
            message: "no database path configured and no home directory available".to_string(),
        })?;
    let db = Database::open(&database_path)?;

    let api_key = config.completion.resolve_api_key()?;
    let completion: Arc<dyn CompletionService> = Arc::new(ChatCompletionClient::new(
        &config.completion.api_url,
        api_key,
        &config.completion.model,
    )?);
    let synthesizer: Arc<dyn CodeSynthesizer> = Arc::new(ExternalToolSynthesizer::new(
        &config.codegen.tool_path,
        Duration::from_secs(config.codegen.timeout_secs),
    ));

    let pipeline_config = Arc::new(PipelineConfig::from_config(&config));
    let analyzer = Arc::new(Analyzer::new(pipeline_config, db.clone(), completion, synthesizer));

    let descriptors = Arc::new(DescriptorSet::new());
    let scanner = DirectoryScanner::new(&config.watch_directory);
    descriptors.replace_all(scanner.scan(&db)?);

    let (events, _) = tokio::sync::broadcast::channel(100);

    let scheduler = AnalysisScheduler::new(
        Arc::clone(&analyzer),
        Arc::clone(&descriptors),
        Duration::from_secs(config.scan_interval_secs),
        events.clone(),
    );

    if cli.once {
        info!("Single analysis pass over {} file(s)", descriptors.len());
        for handle in scheduler.run_pending() {
            let _ = handle.join();
        }
        return Ok(());
    }

    let mut folder_watcher = AsyncFolderWatcher::new(
        &config.watch_directory,
        &config.results_subdirectory,
    );
    let folder_events = folder_watcher.events();
    folder_watcher.start();

    let controller = WatchController::new(
        Arc::clone(&descriptors),
        &config.watch_directory,
        events.clone(),
    );
    let controller_handle = controller.start(folder_events);

    let (trigger_tx, trigger_rx) = tokio::sync::broadcast::channel(16);
    let scheduler_handle = scheduler.start(trigger_rx);

    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .expect("failed to install Ctrl-C handler");

    info!(
        "Watching {} every {}s",
        config.watch_directory, config.scan_interval_secs
    );
    let _ = stop_rx.recv();

    info!("Shutting down (in-flight analyses continue independently)");
    scheduler.stop();
    let _ = trigger_tx.send(());
    controller.stop();
    folder_watcher.stop();

    let _ = scheduler_handle.join();
    let _ = controller_handle.join();

    Ok(())
}
