//! Claimline worker - runs the claim pipeline over JSON lines on stdin

use anyhow::Context;
use clap::Parser;
use claimline_agents::{AgentInvoker, DecisionPipeline, PromptLibrary};
use claimline_context::ContextAssembler;
use claimline_domain::traits::{EventBus, KeyValueStore, LlmProvider, ObjectStore};
use claimline_gatekeeper::ReviewDesk;
use claimline_intake::{ClaimQueries, DocumentProcessor, Intake, TextLayerOcr};
use claimline_llm::{MockProvider, OllamaProvider};
use claimline_orchestrator::{
    CommandHandler, LocalWorkflowStarter, PipelineConfig, PipelineMetrics, PipelineRunner,
    PipelineWorker,
};
use claimline_redactor::{PatternDetector, Redactor};
use claimline_store::{DirParameterStore, FsObjectStore, LogEventBus, SqliteKvStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Claimline worker - process insurance claims from JSON lines on stdin
#[derive(Debug, Parser)]
#[command(name = "claimline-worker")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CLAIMLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the claim database and stored objects
    #[arg(long, env = "CLAIMLINE_DATA_DIR", default_value = "claimline-data")]
    data_dir: PathBuf,

    /// Directory holding the prompt templates
    #[arg(long, env = "CLAIMLINE_PROMPTS_DIR", default_value = "prompts")]
    prompts_dir: PathBuf,

    /// Answer every prompt with this reply instead of calling Ollama
    #[arg(long)]
    mock_llm: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries responses
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    match cli.mock_llm.clone() {
        Some(reply) => run(cli, config, MockProvider::new(reply)).await,
        None => {
            let llm = OllamaProvider::from_config(&config.ollama);
            info!("Using Ollama model {} at {}", config.ollama.model, config.ollama.endpoint);
            run(cli, config, llm).await
        }
    }
}

async fn run<L>(cli: Cli, config: PipelineConfig, llm: L) -> anyhow::Result<()>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("Failed to create {}", cli.data_dir.display()))?;

    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(cli.data_dir.join("claims.db"))?);
    let objects: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(cli.data_dir.join("objects"))?);
    let events: Arc<dyn EventBus> = Arc::new(LogEventBus);
    let params = Arc::new(DirParameterStore::new(&cli.prompts_dir));
    let metrics = Arc::new(PipelineMetrics::new());

    let (starter, receiver) = LocalWorkflowStarter::new(config.orchestrator.queue_capacity);
    let starter = Arc::new(starter);

    let redactor = Redactor::try_new(Arc::new(PatternDetector::new()), config.redactor.clone())?;
    let processor = DocumentProcessor::new(
        objects.clone(),
        store.clone(),
        Arc::new(TextLayerOcr::new(objects.clone())),
        Arc::new(redactor),
        events.clone(),
        config.intake.clone(),
    );
    let assembler = ContextAssembler::new(objects.clone(), store.clone(), config.context.clone());
    let prompts = PromptLibrary::new(
        params,
        config.agents.prompt_prefix.clone(),
        config.agents.prompt_version.clone(),
    );
    let invoker = AgentInvoker::new(Arc::new(llm), prompts, store.clone(), config.agents.clone())?;

    let runner = PipelineRunner::new(
        store.clone(),
        events.clone(),
        processor,
        assembler,
        DecisionPipeline::new(invoker),
        config.orchestrator.clone(),
        metrics.clone(),
    )?;
    let worker = tokio::spawn(PipelineWorker::new(Arc::new(runner), receiver).run());

    let intake = Intake::new(
        store.clone(),
        objects,
        starter.clone(),
        events.clone(),
        config.intake.clone(),
    )?;
    let handler = CommandHandler::new(
        intake,
        ReviewDesk::new(store.clone(), events),
        ClaimQueries::new(store),
        starter,
        metrics,
    );

    info!("Reading commands from stdin (data dir {})", cli.data_dir.display());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    let response = handler.handle_line(&line);
                    stdout.write_all(format!("{}\n", response).as_bytes()).await?;
                    stdout.flush().await?;
                }
                None => {
                    info!("End of input");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Dropping the last starter closes the run queue; queued runs still finish
    drop(handler);
    worker.await??;
    Ok(())
}
