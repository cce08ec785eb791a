// Runtime abstraction for the host that presents the core (CLI today, a GUI or
// web bridge later). The core only ever talks to `RakshaRuntime`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::contacts::ContactEvent;
use crate::emergency::EmergencyEvent;
use crate::gesture::HoldEvent;

/// Runtime-specific errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Event receiver closed")]
    ReceiverClosed,
}

/// Events that can be emitted to the presentation layer
///
/// Adjacently tagged so the inner events keep their own `type` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "channel", content = "event", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// Emergency episode transition
    Emergency(EmergencyEvent),

    /// Contact directory change
    Contacts(ContactEvent),

    /// Hold-to-confirm gesture lifecycle
    Hold(HoldEvent),
}

/// Runtime abstraction for CLI vs other presentation environments
///
/// This trait provides platform-specific functionality for:
/// - Emitting events (view updates, logs, JSON output)
/// - Querying runtime capabilities
///
/// # Object Safety
/// This trait is object-safe and intended to be used as `Arc<dyn RakshaRuntime>`.
///
/// # Ordering
/// `emit()` is called from inside the component that made the transition, so
/// events arrive in the order the transitions happened. Implementations must not
/// reorder them.
#[async_trait]
pub trait RakshaRuntime: Send + Sync + 'static {
    /// Emit an event to the presentation layer
    ///
    /// # Errors
    /// Returns `RuntimeError::ReceiverClosed` if the consumer has gone away.
    fn emit(&self, event: RuntimeEvent) -> Result<(), RuntimeError>;

    /// Check if running in interactive mode (has UI or TTY)
    fn is_interactive(&self) -> bool;

    /// Graceful shutdown - flush events, close channels, etc.
    async fn shutdown(&self) -> Result<(), RuntimeError>;
}

/// Runtime that drops every event. Used when no presentation layer is attached.
#[derive(Debug, Default)]
pub struct NullRuntime;

#[async_trait]
impl RakshaRuntime for NullRuntime {
    fn emit(&self, _event: RuntimeEvent) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        false
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub use cli::CliRuntime;
