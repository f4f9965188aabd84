//! Background worker that executes queued runs

use crate::error::PipelineError;
use crate::runner::{PipelineRunner, RunReport};
use crate::starter::RunRequest;
use claimline_domain::traits::LlmProvider;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

/// Reads run requests from the starter's queue and runs each on its own task
///
/// # Examples
///
/// ```no_run
/// # use claimline_orchestrator::{LocalWorkflowStarter, PipelineRunner, PipelineWorker};
/// # use claimline_llm::MockProvider;
/// # use std::sync::Arc;
/// # async fn example(runner: Arc<PipelineRunner<MockProvider>>) -> Result<(), Box<dyn std::error::Error>> {
/// let (_starter, receiver) = LocalWorkflowStarter::new(64);
/// let worker = PipelineWorker::new(runner, receiver);
///
/// // Run until Ctrl+C or until every starter is dropped
/// worker.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct PipelineWorker<L>
where
    L: LlmProvider,
{
    runner: Arc<PipelineRunner<L>>,
    receiver: mpsc::Receiver<RunRequest>,
}

impl<L> PipelineWorker<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a worker around a runner and a run queue
    pub fn new(runner: Arc<PipelineRunner<L>>, receiver: mpsc::Receiver<RunRequest>) -> Self {
        Self { runner, receiver }
    }

    /// Run until a shutdown signal (Ctrl+C) or until the queue closes
    pub async fn run(self) -> Result<(), PipelineError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes or the queue closes
    ///
    /// Runs that are already executing are awaited, never cancelled. On
    /// shutdown the queue is closed to new starts and the runs already
    /// queued are executed, so every accepted claim ends with a status.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), PipelineError>
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        info!("Pipeline worker started");

        loop {
            tokio::select! {
                request = self.receiver.recv() => match request {
                    Some(request) => {
                        let runner = Arc::clone(&self.runner);
                        tasks.spawn(async move { runner.run(&request).await });
                    }
                    None => {
                        info!("Run queue closed, stopping worker");
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_result(joined);
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping worker");
                    break;
                }
            }
        }

        // Requests still queued were already accepted by the starter
        self.receiver.close();
        let mut queued = 0;
        while let Some(request) = self.receiver.recv().await {
            let runner = Arc::clone(&self.runner);
            tasks.spawn(async move { runner.run(&request).await });
            queued += 1;
        }
        if queued > 0 {
            info!("Running {} queued runs before stopping", queued);
        }

        if !tasks.is_empty() {
            info!("Waiting for {} runs in flight", tasks.len());
        }
        while let Some(joined) = tasks.join_next().await {
            log_result(joined);
        }

        info!(
            "Pipeline worker stopped. Final metrics:\n{}",
            self.runner.metrics().summary()
        );
        Ok(())
    }
}

fn log_result(joined: Result<Result<RunReport, PipelineError>, JoinError>) {
    match joined {
        Ok(Ok(report)) => info!(
            "Run {} for claim {} finished in {}",
            report.execution_id, report.claim_id, report.state
        ),
        Ok(Err(e)) => error!("Run could not record its failure: {}", e),
        Err(e) => error!("Run task failed: {}", e),
    }
}
