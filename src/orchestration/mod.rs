// Asynchronous inference job orchestration: submission, worker dispatch,
// progress and terminal callbacks, cancellation, and the stalled-job
// watchdog.

pub mod orchestrator;
pub mod types;
pub mod watchdog;
pub mod worker;

pub use orchestrator::InferenceJobOrchestrator;
pub use types::{
    ComputeOutput, FetchSpec, JobDispatch, JobStatusView, PreparedInput, ResultArtifact,
    WorkerResult,
};
pub use watchdog::Watchdog;
pub use worker::{ArtifactArchive, CallbackSink, InferenceWorker, ModelCompute, PipelineWorker};
