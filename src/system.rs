//! Wiring of the core components into one running system.

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;

use crate::config::CoreConfig;
use crate::events::{EventPublisher, NotificationFanout};
use crate::models::inference::ModelRegistry;
use crate::orchestration::worker::{ArtifactArchive, InferenceWorker, ModelCompute};
use crate::orchestration::{InferenceJobOrchestrator, PipelineWorker, Watchdog};
use crate::state_machine::OrderStateMachine;
use crate::store::{JobStore, OrderStore};
use crate::web::{self, AppState};

pub struct CoreSystem {
    pub config: CoreConfig,
    pub orders: Arc<OrderStore>,
    pub jobs: Arc<JobStore>,
    pub models: Arc<ModelRegistry>,
    pub fanout: NotificationFanout,
    pub state_machine: Arc<OrderStateMachine>,
    pub orchestrator: Arc<InferenceJobOrchestrator>,
    pub watchdog: Arc<Watchdog>,
}

impl CoreSystem {
    /// Build a system with no worker wired yet; see
    /// [`attach_pipeline_worker`](Self::attach_pipeline_worker) and
    /// [`attach_worker`](Self::attach_worker).
    pub fn new(config: CoreConfig) -> Self {
        let orders = Arc::new(OrderStore::new());
        let jobs = Arc::new(JobStore::new());
        let models = Arc::new(ModelRegistry::new());
        let fanout = NotificationFanout::new(EventPublisher::new(config.event_channel_capacity));

        let state_machine = Arc::new(OrderStateMachine::new(Arc::clone(&orders), fanout.clone()));
        let orchestrator = Arc::new(InferenceJobOrchestrator::new(
            Arc::clone(&orders),
            Arc::clone(&jobs),
            Arc::clone(&models),
            fanout.clone(),
        ));
        let watchdog = Arc::new(Watchdog::new(Arc::clone(&orchestrator), config.clone()));

        Self {
            config,
            orders,
            jobs,
            models,
            fanout,
            state_machine,
            orchestrator,
            watchdog,
        }
    }

    /// Wire the in-process pipeline worker over the given collaborators. The
    /// orchestrator is its callback sink.
    pub fn attach_pipeline_worker(
        &self,
        archive: Arc<dyn ArtifactArchive>,
        compute: Arc<dyn ModelCompute>,
    ) -> Arc<PipelineWorker> {
        let worker = Arc::new(PipelineWorker::new(
            archive,
            compute,
            Arc::clone(&self.orchestrator) as _,
        ));
        self.orchestrator
            .set_worker(Arc::clone(&worker) as Arc<dyn InferenceWorker>);
        worker
    }

    /// Wire an arbitrary worker boundary (e.g. a remote pool client).
    pub fn attach_worker(&self, worker: Arc<dyn InferenceWorker>) {
        self.orchestrator.set_worker(worker);
    }

    pub fn router(&self) -> Router {
        web::router(AppState::new(
            Arc::clone(&self.state_machine),
            Arc::clone(&self.orchestrator),
        ))
    }

    pub fn spawn_watchdog(&self) -> JoinHandle<()> {
        Arc::clone(&self.watchdog).spawn()
    }
}
