//! Delivery gateway and dispatch policies
//!
//! The transport itself lives outside this crate. A [`DeliveryGateway`]
//! receives the already-serialized notice; [`Dispatch`] decides whether that
//! happens on the calling thread or in the background.

use crate::error::DeliveryError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Transport for serialized notices
pub trait DeliveryGateway: Send + Sync {
    /// Send one JSON payload
    ///
    /// # Errors
    /// Returns error if the transport fails
    fn deliver_serialized(&self, payload: &str) -> Result<(), DeliveryError>;
}

impl<F> DeliveryGateway for F
where
    F: Fn(&str) -> Result<(), DeliveryError> + Send + Sync,
{
    fn deliver_serialized(&self, payload: &str) -> Result<(), DeliveryError> {
        self(payload)
    }
}

/// Reference-counted gateway, as stored in configuration
pub type SharedGateway = Arc<dyn DeliveryGateway>;

/// Where the gateway runs
#[derive(Debug, Clone, Default)]
pub enum Dispatch {
    /// On the calling thread
    #[default]
    Inline,
    /// On the runtime's blocking pool
    Tokio(tokio::runtime::Handle),
    /// On a detached OS thread
    Thread,
}

impl Dispatch {
    /// Background dispatch on the current Tokio runtime, or a thread outside one
    #[must_use]
    pub fn background() -> Self {
        tokio::runtime::Handle::try_current().map_or(Self::Thread, Self::Tokio)
    }

    /// Check if delivery leaves the calling thread
    #[inline]
    #[must_use]
    pub fn is_async(&self) -> bool {
        !matches!(self, Self::Inline)
    }
}

/// Result of reporting one notice
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Gateway accepted the payload
    Delivered,
    /// Payload handed to a background context
    Dispatched,
    /// Notice matched an ignore rule
    Ignored,
    /// Environment is not public
    Suppressed,
    /// No gateway configured
    NotConfigured,
    /// Gateway or dispatch failed
    Failed(DeliveryError),
}

impl DeliveryOutcome {
    /// Check if the payload was delivered or handed off
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered | Self::Dispatched)
    }
}

fn send(gateway: &dyn DeliveryGateway, payload: &str) -> Result<(), DeliveryError> {
    catch_unwind(AssertUnwindSafe(|| gateway.deliver_serialized(payload)))
        .unwrap_or_else(|_| Err(DeliveryError::transport("gateway panicked")))
}

fn send_in_background(gateway: &dyn DeliveryGateway, payload: &str) {
    match send(gateway, payload) {
        Ok(()) => tracing::debug!(bytes = payload.len(), "background delivery finished"),
        Err(err) => tracing::warn!(error = %err, "background delivery failed"),
    }
}

/// Hand `payload` to `gateway` according to `policy`
///
/// Never panics; failures are logged and reported through the outcome.
#[must_use]
pub fn dispatch(gateway: SharedGateway, payload: String, policy: &Dispatch) -> DeliveryOutcome {
    match policy {
        Dispatch::Inline => match send(gateway.as_ref(), &payload) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(err) => {
                tracing::warn!(error = %err, "delivery failed");
                DeliveryOutcome::Failed(err)
            }
        },
        Dispatch::Tokio(handle) => {
            tracing::debug!(bytes = payload.len(), "dispatching notice to blocking pool");
            // The join handle is dropped; the task runs to completion detached.
            drop(handle.spawn_blocking(move || send_in_background(gateway.as_ref(), &payload)));
            DeliveryOutcome::Dispatched
        }
        Dispatch::Thread => {
            tracing::debug!(bytes = payload.len(), "dispatching notice to thread");
            let spawned = std::thread::Builder::new()
                .name("faultline-delivery".to_string())
                .spawn(move || send_in_background(gateway.as_ref(), &payload));
            match spawned {
                Ok(_) => DeliveryOutcome::Dispatched,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to spawn delivery thread");
                    DeliveryOutcome::Failed(DeliveryError::Dispatch(err.to_string()))
                }
            }
        }
    }
}
