//! Shared test doubles and pipeline construction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_herald::config::GlobalConfig;
use chat_herald::models::chat::ChatEvent;
use chat_herald::monitor::{Monitor, PipelineParts};
use chat_herald::pipeline::intake::DedupScope;
use chat_herald::pipeline::processor::Processor;
use chat_herald::pipeline::state::PipelineState;
use chat_herald::respond::generator::ResponseGenerator;
use chat_herald::speech::announcer::Announcer;
use chat_herald::speech::command::{SpeakFuture, Synthesizer};
use chat_herald::speech::observers::ObserverHub;
use chat_herald::AppError;
use tokio_util::sync::CancellationToken;

/// How a [`FakeSynth`] behaves.
#[derive(Debug, Clone, Copy)]
pub enum SynthMode {
    /// Finish after the given delay.
    Succeed(Duration),
    /// Fail immediately.
    Fail,
    /// Never finish.
    Hang,
}

/// Synthesizer double that records texts and tracks overlap.
pub struct FakeSynth {
    mode: SynthMode,
    pub spoken: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeSynth {
    pub fn new(mode: SynthMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            spoken: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Synthesizer for FakeSynth {
    fn speak<'a>(&'a self, text: &'a str) -> SpeakFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            let result = match self.mode {
                SynthMode::Succeed(delay) => {
                    tokio::time::sleep(delay).await;
                    self.spoken.lock().unwrap().push(text.to_owned());
                    Ok(())
                }
                SynthMode::Fail => Err(AppError::Speech("no audio device".into())),
                SynthMode::Hang => std::future::pending::<chat_herald::Result<()>>().await,
            };

            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

pub fn event(user: &str, text: &str) -> ChatEvent {
    ChatEvent::new(user, text, None).expect("valid event")
}

/// Processor wired to default pools and the given synthesizer.
pub fn processor_with(
    synth: Arc<FakeSynth>,
    hub: ObserverHub,
    speech_timeout: Duration,
) -> (Processor, Arc<Announcer>) {
    let state = Arc::new(PipelineState::new(DedupScope::Seen));
    let generator = Arc::new(ResponseGenerator::new(&GlobalConfig::default().generator));
    let announcer = Arc::new(Announcer::new(synth, hub, speech_timeout));
    let processor = Processor::new(state, generator, Arc::clone(&announcer));
    (processor, announcer)
}

/// Config suitable for tests: fast ticks, no real speech program.
pub fn test_config() -> GlobalConfig {
    let mut config = GlobalConfig::default();
    config.ipc_name = format!("chat-herald-test-{}", uuid::Uuid::new_v4());
    config.http.port = 0;
    config.processor.tick_millis = 20;
    config.speech.enabled = false;
    config.source.program = "sh".into();
    config.source.initial_delay_seconds = 0;
    config.source.max_delay_seconds = 0;
    config
}

/// Monitor over `config` with a succeeding fake synthesizer.
pub fn test_monitor(config: GlobalConfig) -> (Arc<Monitor>, CancellationToken) {
    let config = Arc::new(config);
    let hub = ObserverHub::default();
    let synth: Arc<dyn Synthesizer> = FakeSynth::new(SynthMode::Succeed(Duration::ZERO));
    let parts = PipelineParts {
        state: Arc::new(PipelineState::new(config.processor.dedup_scope)),
        generator: Arc::new(ResponseGenerator::new(&config.generator)),
        announcer: Arc::new(Announcer::new(synth, hub, config.speech.timeout())),
    };
    let ct = CancellationToken::new();
    let monitor = Arc::new(Monitor::new(config, parts, ct.clone()));
    (monitor, ct)
}

/// Poll `check` every 20 ms until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
