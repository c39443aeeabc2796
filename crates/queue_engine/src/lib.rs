//! Queue engine: HTTP access to the download server, run off the UI thread.
mod api;
mod engine;
mod types;

pub use api::{ApiSettings, DownloadApi, ReqwestDownloadApi};
pub use engine::{EngineError, EngineHandle};
pub use types::{ChannelEventSink, EngineEvent, EventSink, FailureKind, FetchError, JobId};
