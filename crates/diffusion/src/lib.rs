//! Remote texture generation for texpaint
//!
//! A generation service turns a text prompt into an image that can seed a
//! surface's persistent texture. The painting pipeline never waits on it:
//! hosts await [`GenerationBackend::generate`] on their own runtime and hand
//! the result to the painter when it arrives.

mod remote;

pub use remote::{RemoteGeneration, DEFAULT_TIMEOUT};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server returned HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Generation failed: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },

    #[error("Cancelled")]
    Cancelled,
}

/// Prompt and output parameters sent to the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    /// Model identifier understood by the service
    pub model: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            steps: 20,
            width: 512,
            height: 512,
            model: "default".to_string(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Service reply: a base64 image on success, or an error message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct CancelState {
    active: AtomicBool,
    requested: AtomicBool,
    notify: Notify,
}

/// Clonable handle that aborts a backend's in-flight generation.
///
/// Cancelling only affects a request that is running; while the backend is
/// idle [`CancelHandle::cancel`] does nothing and returns false.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the running request; returns false if nothing was running
    pub fn cancel(&self) -> bool {
        if !self.state.active.load(Ordering::SeqCst) {
            return false;
        }
        self.state.requested.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
        true
    }

    /// Whether a request is running
    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    pub(crate) fn begin(&self) {
        self.state.requested.store(false, Ordering::SeqCst);
        self.state.active.store(true, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        self.state.active.store(false, Ordering::SeqCst);
        self.state.requested.store(false, Ordering::SeqCst);
    }

    /// Resolves once the running request is cancelled
    pub(crate) async fn cancelled(&self) {
        let notified = self.state.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel is not missed
        notified.as_mut().enable();
        if self.state.requested.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }
}

/// Trait for generation backends
#[allow(async_fn_in_trait)]
pub trait GenerationBackend {
    /// Generate an image for the request
    async fn generate(&mut self, request: GenerationRequest) -> Result<image::RgbaImage, GenerationError>;

    /// Handle that can cancel a running [`GenerationBackend::generate`] from elsewhere
    fn cancel_handle(&self) -> CancelHandle;

    /// Check if currently generating
    fn is_generating(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_expected_fields() {
        let request = GenerationRequest::new("mossy stone")
            .with_size(256, 128)
            .with_steps(30)
            .with_model("sd-turbo");

        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "mossy stone");
        assert_eq!(json["steps"], 30);
        assert_eq!(json["width"], 256);
        assert_eq!(json["height"], 128);
        assert_eq!(json["model"], "sd-turbo");
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_cancel_while_idle_is_ignored() {
        let handle = CancelHandle::new();
        assert!(!handle.cancel());

        handle.begin();
        assert!(handle.clone().cancel());
        handle.finish();
        assert!(!handle.is_active());
        assert!(!handle.state.requested.load(Ordering::SeqCst));
    }

    #[test]
    fn test_response_fields_are_optional() {
        let response: GenerationResponse = serde_json::from_str(r#"{"error":"out of memory"}"#).unwrap();
        assert_eq!(response.error.as_deref(), Some("out of memory"));
        assert!(response.image.is_none());
    }
}
