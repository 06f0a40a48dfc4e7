//! Model Gateway port
//!
//! Defines the interface for querying backend models. Adapters live in the
//! infrastructure layer.

use async_trait::async_trait;
use futures::future::join_all;
use quorum_domain::{Message, ModelId, ModelResponse, QueryOptions, QueryOutcome};
use thiserror::Error;

/// Errors that can occur during model gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Timeout")]
    Timeout,

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Transient(_) | GatewayError::RateLimited | GatewayError::Timeout
        )
    }
}

/// Gateway for backend model communication
///
/// Implementations must honor `options.cache_control` by enabling
/// provider-side prompt caching where the provider supports it.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Query a single model with a prepared conversation
    async fn query_model(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &QueryOptions,
    ) -> Result<ModelResponse, GatewayError>;

    /// Query several models with the same conversation in parallel.
    ///
    /// A failing model never blocks the others; it is reported in
    /// `failed_models`.
    async fn query_models(
        &self,
        messages: &[Message],
        models: &[ModelId],
        options: &QueryOptions,
    ) -> QueryOutcome {
        let results = join_all(
            models
                .iter()
                .map(|model| async move { (model, self.query_model(model, messages, options).await) }),
        )
        .await;

        let mut outcome = QueryOutcome::default();
        for (model, result) in results {
            match result {
                Ok(response) => outcome.successful_responses.push(response),
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", model, e);
                    outcome.failed_models.push(model.clone());
                }
            }
        }
        outcome
    }
}
