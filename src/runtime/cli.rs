use super::{RakshaRuntime, RuntimeError, RuntimeEvent};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

pub struct CliRuntime {
    /// `None` once shut down; dropping the sender ends the output loop.
    event_tx: RwLock<Option<mpsc::UnboundedSender<RuntimeEvent>>>,
    json_mode: bool,
}

impl CliRuntime {
    pub fn new(event_tx: mpsc::UnboundedSender<RuntimeEvent>, json_mode: bool) -> Self {
        Self {
            event_tx: RwLock::new(Some(event_tx)),
            json_mode,
        }
    }

    pub fn json_mode(&self) -> bool {
        self.json_mode
    }
}

#[async_trait]
impl RakshaRuntime for CliRuntime {
    fn emit(&self, event: RuntimeEvent) -> Result<(), RuntimeError> {
        // Send to channel for CLI event handler to process
        self.event_tx
            .read()
            .as_ref()
            .ok_or(RuntimeError::ReceiverClosed)?
            .send(event)
            .map_err(|_| RuntimeError::ReceiverClosed)?;
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        atty::is(atty::Stream::Stdin)
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        // Dropping the sender closes the channel once queued events drain
        self.event_tx.write().take();
        Ok(())
    }
}
