//! View state for one user session: the current invention, the visible
//! error and the loading flag.
//!
//! Requests run as spawned tasks holding only a weak handle to the state,
//! so a shell dropped mid-request simply discards the late result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use forge_client::{GenerativeBackend, Orchestrator};
use forge_core::InventionOutput;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Generate,
    Refine,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Generate => "generate",
            RequestKind::Refine => "refine",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub output: Option<Arc<InventionOutput>>,
    pub error: Option<String>,
    /// Set while a request is in flight.
    pub pending: Option<RequestKind>,
    pub last_request: Option<Uuid>,
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

/// How a submitted request ended.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Rejected without touching state: blank input, nothing to refine, or
    /// another request still pending.
    Ignored,
    Completed(Arc<InventionOutput>),
    /// `restored` is true when a refinement failed and the prior output was
    /// put back.
    Failed { message: String, restored: bool },
    /// The shell was gone by the time the result arrived.
    Detached,
}

pub struct Shell<B> {
    state: Arc<Mutex<ViewState>>,
    orchestrator: Arc<Orchestrator<B>>,
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<B: GenerativeBackend + 'static> Shell<B> {
    pub fn new(orchestrator: Arc<Orchestrator<B>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewState::default())),
            orchestrator,
        }
    }

    pub fn snapshot(&self) -> ViewState {
        lock(&self.state).clone()
    }

    pub fn output(&self) -> Option<Arc<InventionOutput>> {
        lock(&self.state).output.clone()
    }

    /// Start a fresh generation. `None` when the request was ignored.
    pub fn begin_generate(&self, prompt: &str) -> Option<JoinHandle<Outcome>> {
        let prompt = prompt.trim().to_string();
        let id = {
            let mut state = lock(&self.state);
            if state.is_loading() || prompt.is_empty() {
                return None;
            }
            let id = Uuid::new_v4();
            state.pending = Some(RequestKind::Generate);
            state.error = None;
            state.output = None;
            state.last_request = Some(id);
            id
        };
        Some(self.spawn(id, RequestKind::Generate, prompt, None))
    }

    /// Rewrite the current invention. Ignored when there is nothing to
    /// refine; on failure the previous output is restored.
    pub fn begin_refine(&self, instruction: &str) -> Option<JoinHandle<Outcome>> {
        let instruction = instruction.trim().to_string();
        let (id, previous) = {
            let mut state = lock(&self.state);
            if state.is_loading() || instruction.is_empty() || state.output.is_none() {
                return None;
            }
            let previous = state.output.take()?;
            let id = Uuid::new_v4();
            state.pending = Some(RequestKind::Refine);
            state.error = None;
            state.last_request = Some(id);
            (id, previous)
        };
        Some(self.spawn(id, RequestKind::Refine, instruction, Some(previous)))
    }

    pub async fn generate(&self, prompt: &str) -> Outcome {
        Self::join(self.begin_generate(prompt)).await
    }

    pub async fn refine(&self, instruction: &str) -> Outcome {
        Self::join(self.begin_refine(instruction)).await
    }

    async fn join(handle: Option<JoinHandle<Outcome>>) -> Outcome {
        let Some(handle) = handle else {
            return Outcome::Ignored;
        };
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("generation task failed: {e}");
                Outcome::Detached
            }
        }
    }

    fn spawn(
        &self,
        id: Uuid,
        kind: RequestKind,
        input: String,
        previous: Option<Arc<InventionOutput>>,
    ) -> JoinHandle<Outcome> {
        let state: Weak<Mutex<ViewState>> = Arc::downgrade(&self.state);
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            tracing::info!(request = %id, kind = kind.as_str(), "request started");
            let result = orchestrator.generate(&input, previous.as_deref()).await;

            let Some(state) = state.upgrade() else {
                tracing::debug!(request = %id, "view closed; dropping result");
                return Outcome::Detached;
            };
            let mut state = lock(&state);
            state.pending = None;
            match result {
                Ok(output) => {
                    let output = Arc::new(output);
                    state.output = Some(Arc::clone(&output));
                    tracing::info!(request = %id, title = %output.title(), "request completed");
                    Outcome::Completed(output)
                }
                Err(e) => {
                    let message = e.user_message().to_string();
                    state.error = Some(message.clone());
                    let restored = previous.is_some();
                    if restored {
                        state.output = previous;
                    }
                    tracing::warn!(request = %id, restored, "request failed: {e:?}");
                    Outcome::Failed { message, restored }
                }
            }
        })
    }
}
