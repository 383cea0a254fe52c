//! Monitoring controller.
//!
//! Owns the pipeline (state, generator, announcer, observer hub), the
//! processor task, and at most one chat source supervisor. This is the
//! single entry point used by the HTTP and IPC surfaces.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

use crate::config::GlobalConfig;
use crate::models::status::{SourceState, StatusReport};
use crate::pipeline::processor::Processor;
use crate::pipeline::state::{PipelineState, ProcessorState};
use crate::respond::backend::OpenAiBackend;
use crate::respond::generator::{Enhancement, ResponseGenerator};
use crate::source::spawner::SourceTarget;
use crate::source::supervisor::{spawn_supervisor, SupervisorHandle};
use crate::speech::announcer::{Announcer, AnnouncerState};
use crate::speech::command::{CommandSynthesizer, Synthesizer};
use crate::speech::observers::ObserverHub;
use crate::Result;

/// Everything the pipeline needs, assembled but not yet running.
pub struct PipelineParts {
    /// Queue, processed history, processor flag.
    pub state: Arc<PipelineState>,
    /// Reply generator.
    pub generator: Arc<ResponseGenerator>,
    /// Speech announcer.
    pub announcer: Arc<Announcer>,
}

impl PipelineParts {
    /// Build production parts from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the enhancement backend cannot be built.
    pub fn from_config(config: &GlobalConfig, hub: ObserverHub) -> Result<Self> {
        let mut generator = ResponseGenerator::new(&config.generator);
        if config.backend.enabled {
            let backend = OpenAiBackend::from_config(&config.backend)?;
            generator = generator.with_backend(Arc::new(backend), Enhancement::from(&config.backend));
            info!(model = %config.backend.model, "reply enhancement enabled");
        }

        let synthesizer: Arc<dyn Synthesizer> =
            Arc::new(CommandSynthesizer::from_config(&config.speech));
        let announcer = if config.speech.enabled {
            Announcer::new(synthesizer, hub, config.speech.timeout())
        } else {
            info!("speech disabled by configuration");
            Announcer::disabled(synthesizer, hub, config.speech.timeout())
        };

        Ok(Self {
            state: Arc::new(PipelineState::new(config.processor.dedup_scope)),
            generator: Arc::new(generator),
            announcer: Arc::new(announcer),
        })
    }
}

struct ActiveSource {
    supervisor: SupervisorHandle,
}

/// Starts, stops, and reports on monitoring of one token.
pub struct Monitor {
    config: Arc<GlobalConfig>,
    state: Arc<PipelineState>,
    announcer: Arc<Announcer>,
    processor: Processor,
    processor_task: Mutex<Option<JoinHandle<()>>>,
    /// Serializes `start`/`stop`; held across supervisor shutdown.
    lifecycle: Mutex<()>,
    /// Held only briefly, so `status` never waits on a restart.
    source: Mutex<Option<ActiveSource>>,
    cancel: CancellationToken,
}

impl Monitor {
    /// Create an idle monitor. Nothing runs until [`Monitor::start`].
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, parts: PipelineParts, cancel: CancellationToken) -> Self {
        let processor = Processor::new(
            Arc::clone(&parts.state),
            parts.generator,
            Arc::clone(&parts.announcer),
        );

        Self {
            config,
            state: parts.state,
            announcer: parts.announcer,
            processor,
            processor_task: Mutex::new(None),
            lifecycle: Mutex::new(()),
            source: Mutex::new(None),
            cancel,
        }
    }

    /// Observer hub for live clients.
    #[must_use]
    pub fn hub(&self) -> &ObserverHub {
        self.announcer.hub()
    }

    /// Shared pipeline state.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Begin monitoring `token_address`.
    ///
    /// Any source already running is stopped first, so calling this again
    /// restarts monitoring (possibly for a different token). The processor
    /// is started on first use and keeps running across restarts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the token address is invalid.
    pub async fn start(&self, token_address: &str, token_name: Option<&str>) -> Result<StatusReport> {
        let target = SourceTarget::new(token_address, token_name)?;
        let span = info_span!("monitor_start", token = %target.token_address);

        async {
            let _lifecycle = self.lifecycle.lock().await;
            let previous = self.source.lock().await.take();
            if let Some(previous) = previous {
                info!(
                    previous = %previous.supervisor.target().token_address,
                    "stopping previous chat source"
                );
                previous.supervisor.stop().await;
            }

            self.ensure_processor().await;

            let supervisor = spawn_supervisor(
                self.config.source.clone(),
                target,
                Arc::clone(&self.state),
                &self.cancel,
            );
            *self.source.lock().await = Some(ActiveSource { supervisor });
            info!("monitoring started");
        }
        .instrument(span)
        .await;

        Ok(self.status().await)
    }

    /// Stop the chat source. The processor keeps draining queued events.
    ///
    /// Returns `false` if nothing was being monitored.
    pub async fn stop(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        let previous = self.source.lock().await.take();
        match previous {
            Some(active) => {
                active.supervisor.stop().await;
                info!("monitoring stopped");
                true
            }
            None => false,
        }
    }

    /// Current pipeline and source status.
    pub async fn status(&self) -> StatusReport {
        let (token_address, token_name, source) = match self.source.lock().await.as_ref() {
            Some(active) => {
                let target = active.supervisor.target();
                (
                    Some(target.token_address.clone()),
                    target.token_name.clone(),
                    active.supervisor.source_state(),
                )
            }
            None => (None, None, SourceState::Stopped),
        };

        StatusReport {
            token_address,
            token_name,
            queue_depth: self.state.queue_depth(),
            processing: self.state.processor_state() == ProcessorState::Busy,
            speaking: self.announcer.is_speaking(),
            speech_enabled: self.announcer.state() == AnnouncerState::Enabled,
            processed_count: self.state.processed_count(),
            source,
        }
    }

    /// Stop the source and processor and wait for both.
    pub async fn shutdown(&self) {
        self.stop().await;
        if let Some(task) = self.processor_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }
        info!("monitor shut down");
    }

    async fn ensure_processor(&self) {
        let mut task = self.processor_task.lock().await;
        let running = task.as_ref().is_some_and(|handle| !handle.is_finished());
        if !running {
            *task = Some(
                self.processor
                    .clone()
                    .spawn(self.config.processor.tick(), self.cancel.child_token()),
            );
        }
    }
}
