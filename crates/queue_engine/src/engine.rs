use std::sync::{mpsc, Arc};
use std::thread;

use queue_logging::{queue_debug, queue_info};
use thiserror::Error;

use crate::api::{ApiSettings, DownloadApi, ReqwestDownloadApi};
use crate::{EngineEvent, EventSink, FetchError, JobId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build the async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to set up the HTTP client: {0}")]
    Client(FetchError),
    #[error("failed to start the engine thread: {0}")]
    Thread(std::io::Error),
}

#[derive(Debug)]
enum EngineCommand {
    FetchStatus { request: u64 },
    FetchActiveDownloads,
    Submit { id: JobId },
    Cancel { id: JobId },
    ClearCompleted,
}

/// Runs API calls on a background tokio runtime and reports completions
/// through an [`EventSink`]. Commands never block the caller.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        queue_info!("Engine talking to {}", settings.base_url);
        let api = ReqwestDownloadApi::new(settings).map_err(EngineError::Client)?;
        Self::with_api(Arc::new(api), sink)
    }

    pub fn with_api(
        api: Arc<dyn DownloadApi>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("queue-engine")
            .build()?;

        thread::Builder::new()
            .name("queue-engine-dispatch".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let api = api.clone();
                    let sink = sink.clone();
                    runtime.spawn(async move {
                        handle_command(api.as_ref(), command, sink.as_ref()).await;
                    });
                }
                queue_debug!("Engine command channel closed");
            })
            .map_err(EngineError::Thread)?;

        Ok(Self { cmd_tx })
    }

    pub fn fetch_status(&self, request: u64) {
        self.send(EngineCommand::FetchStatus { request });
    }

    pub fn fetch_active_downloads(&self) {
        self.send(EngineCommand::FetchActiveDownloads);
    }

    pub fn submit(&self, id: impl Into<JobId>) {
        self.send(EngineCommand::Submit { id: id.into() });
    }

    pub fn cancel(&self, id: impl Into<JobId>) {
        self.send(EngineCommand::Cancel { id: id.into() });
    }

    pub fn clear_completed(&self) {
        self.send(EngineCommand::ClearCompleted);
    }

    fn send(&self, command: EngineCommand) {
        if let Err(err) = self.cmd_tx.send(command) {
            queue_debug!("Engine stopped, dropping {:?}", err.0);
        }
    }
}

async fn handle_command(api: &dyn DownloadApi, command: EngineCommand, sink: &dyn EventSink) {
    let event = match command {
        EngineCommand::FetchStatus { request } => EngineEvent::StatusFetched {
            request,
            result: api.fetch_status().await,
        },
        EngineCommand::FetchActiveDownloads => EngineEvent::ActiveDownloadsFetched {
            result: api.fetch_active_downloads().await,
        },
        EngineCommand::Submit { id } => {
            let result = api.submit_download(&id).await;
            EngineEvent::SubmitCompleted { id, result }
        }
        EngineCommand::Cancel { id } => {
            let result = api.cancel_download(&id).await;
            EngineEvent::CancelCompleted { id, result }
        }
        EngineCommand::ClearCompleted => EngineEvent::ClearCompletedDone {
            result: api.clear_completed().await,
        },
    };
    sink.emit(event);
}
