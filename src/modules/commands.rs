//! Outbound control commands

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::modules::events::EVENT_UPLOAD_CANCEL;

/// Outbound command for the event source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlCommand {
    /// Stop the running batch (`uploadCancel`)
    Cancel,
}

impl ControlCommand {
    /// Wire name of this command
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Cancel => EVENT_UPLOAD_CANCEL,
        }
    }
}

/// Control channel back to the event source
pub trait ControlChannel: Send + Sync {
    /// Deliver one command, failing if the other side is gone
    fn send(&self, command: ControlCommand) -> Result<()>;
}

impl ControlChannel for mpsc::UnboundedSender<ControlCommand> {
    fn send(&self, command: ControlCommand) -> Result<()> {
        mpsc::UnboundedSender::send(self, command).map_err(|_| AppError::ChannelClosed("control"))
    }
}

/// Workers that watch a token stop on cancel
impl ControlChannel for CancellationToken {
    fn send(&self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Cancel => self.cancel(),
        }
        Ok(())
    }
}

/// Issues commands to the event source without touching local state
#[derive(Clone)]
pub struct CommandEmitter {
    channel: Arc<dyn ControlChannel>,
}

impl CommandEmitter {
    /// Emitter over the given channel
    pub fn new(channel: impl ControlChannel + 'static) -> Self {
        Self {
            channel: Arc::new(channel),
        }
    }

    /// Ask the event source to stop the running batch.
    ///
    /// Fire-and-forget: the effect shows up later as worker error/idle
    /// statuses and a batch stop.
    pub fn request_cancel(&self) -> Result<()> {
        let command = ControlCommand::Cancel;
        log::info!("Requesting upload cancellation ({})", command.event_name());
        self.channel
            .send(command)
            .inspect_err(|e| log::error!("Failed to send cancel request: {e}"))
    }
}

impl std::fmt::Debug for CommandEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEmitter").finish_non_exhaustive()
    }
}
