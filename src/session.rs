//! The comparison cycle.
//!
//! A [`ComparisonSession`] owns the parameter set and the result state. Each
//! submission sends the prompt to the base and the trained model at the same
//! time, waits for both, and either stores both images or none.

use crate::{
    client::ImageBackend,
    error::{CompareError, Result},
    models::{GenerationParams, ImagePair, ModelTarget, ParamUpdate, WireFormat},
};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

pub const FAILURE_MESSAGE: &str = "Image generation failed";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ComparisonState {
    #[default]
    Idle,
    Busy,
    Ready(ImagePair),
    Failed(String),
}

impl ComparisonState {
    pub fn is_busy(&self) -> bool {
        matches!(self, ComparisonState::Busy)
    }

    pub fn images(&self) -> Option<&ImagePair> {
        match self {
            ComparisonState::Ready(pair) => Some(pair),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ComparisonState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Receives the single user-facing notice for a failed cycle.
pub trait FailureNotifier: Send + Sync {
    fn notify_failure(&self, message: &str, error: &CompareError);
}

/// Reports failures through the log.
pub struct LogNotifier;

impl FailureNotifier for LogNotifier {
    fn notify_failure(&self, message: &str, error: &CompareError) {
        log::error!("❌ {}: {}", message, error);
    }
}

pub struct ComparisonSession<B: ImageBackend> {
    backend: B,
    wire_format: WireFormat,
    params: Mutex<GenerationParams>,
    state: watch::Sender<ComparisonState>,
    notifier: Box<dyn FailureNotifier>,
}

impl<B: ImageBackend> ComparisonSession<B> {
    pub fn new(backend: B, wire_format: WireFormat) -> Self {
        let (state, _) = watch::channel(ComparisonState::Idle);
        Self {
            backend,
            wire_format,
            params: Mutex::new(GenerationParams::default()),
            state,
            notifier: Box::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: impl FailureNotifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_params(self, params: GenerationParams) -> Self {
        self.set_params(params);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    pub fn params(&self) -> GenerationParams {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_params(&self, params: GenerationParams) {
        *self.params.lock().unwrap_or_else(PoisonError::into_inner) = params;
    }

    /// Merges one field into the current parameters.
    pub fn update_param(&self, update: ParamUpdate) -> GenerationParams {
        log::debug!("Parameter update: {:?}", update);
        let mut guard = self.params.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = guard.clone().with(update);
        guard.clone()
    }

    pub fn state(&self) -> ComparisonState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ComparisonState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    /// Runs one comparison cycle for `prompt`.
    ///
    /// Returns `Ok(None)` without touching anything when the prompt is empty,
    /// and [`CompareError::Busy`] while another cycle is still running.
    pub async fn submit(&self, prompt: &str) -> Result<Option<ImagePair>> {
        if prompt.is_empty() {
            log::debug!("Empty prompt, nothing to submit");
            return Ok(None);
        }

        let claimed = self.state.send_if_modified(|state| {
            if state.is_busy() {
                false
            } else {
                *state = ComparisonState::Busy;
                true
            }
        });
        if !claimed {
            log::warn!("⚠️  Submission ignored, a comparison is already running");
            return Err(CompareError::Busy);
        }
        let _guard = BusyGuard { state: &self.state };

        let cycle = Uuid::new_v4();
        let params = self.params();
        log::info!("🔄 Comparison {} started for prompt \"{}\"", cycle, prompt);

        let base_payload = self.wire_format.payload(ModelTarget::Base, prompt, &params);
        let trained_payload = self
            .wire_format
            .payload(ModelTarget::Trained, prompt, &params);

        let (base, trained) = futures::future::join(
            self.backend.generate(ModelTarget::Base, base_payload),
            self.backend.generate(ModelTarget::Trained, trained_payload),
        )
        .await;

        let outcome = match (base, trained) {
            (Ok(base), Ok(trained)) => Ok(ImagePair { base, trained }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(base_err), Err(trained_err)) => {
                log::debug!("Comparison {} trained side also failed: {}", cycle, trained_err);
                Err(base_err)
            }
        };

        match outcome {
            Ok(pair) => {
                log::info!(
                    "✅ Comparison {} finished (base {} bytes, trained {} bytes)",
                    cycle,
                    pair.base.len(),
                    pair.trained.len()
                );
                self.state.send_replace(ComparisonState::Ready(pair.clone()));
                Ok(Some(pair))
            }
            Err(e) => {
                log::debug!("Comparison {} failed: {}", cycle, e);
                self.state.send_replace(ComparisonState::Failed(e.to_string()));
                self.notifier.notify_failure(FAILURE_MESSAGE, &e);
                Err(e)
            }
        }
    }
}

/// Leaves `Busy` even if the submitting future is dropped mid-flight.
struct BusyGuard<'a> {
    state: &'a watch::Sender<ComparisonState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                *state = ComparisonState::Idle;
                true
            } else {
                false
            }
        });
    }
}
