//! Actor subsystem. Each actor is a single Tokio task draining a bounded mailbox
//! and mutating state nobody else touches; `ActorHandle<M>` generalizes the reference
//! actor framework's cloneable, channel-backed handle without its macro-generated
//! message-set plumbing — these message enums are written by hand.

pub mod alert;
pub mod data_store;
pub mod subsystem;

use crate::errors::{Result, SensorPipelineError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

pub struct ActorHandle<M> {
    tx: mpsc::Sender<M>,
}

impl<M> Clone for ActorHandle<M> {
    fn clone(&self) -> Self {
        ActorHandle { tx: self.tx.clone() }
    }
}

impl<M: Send + 'static> ActorHandle<M> {
    pub fn new(tx: mpsc::Sender<M>) -> Self {
        ActorHandle { tx }
    }

    /// Blocks only until the mailbox has room; never waits for the message to be processed.
    pub async fn send_msg(&self, msg: M) -> Result<()> {
        self.tx.send(msg).await.map_err(|_| SensorPipelineError::MailboxClosed)
    }

    pub fn try_send_msg(&self, msg: M) -> Result<()> {
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SensorPipelineError::MailboxFull,
            mpsc::error::TrySendError::Closed(_) => SensorPipelineError::MailboxClosed,
        })
    }
}

/// Sends `msg` and awaits `rx` under `deadline`, the hard contract for every actor
/// request-reply call (`AnalyzeType`/`GetProcessed`/`GetAlerts`). The deadline itself
/// comes from `PipelineConfig::actor_request_timeout` rather than a call-site constant.
pub async fn query<A: Send + 'static>(
    send: impl std::future::Future<Output = Result<()>>,
    rx: oneshot::Receiver<A>,
    deadline: Duration,
) -> Result<A> {
    send.await?;
    match timeout(deadline, rx).await {
        Ok(Ok(answer)) => Ok(answer),
        Ok(Err(_)) => Err(SensorPipelineError::MailboxClosed),
        Err(_) => Err(SensorPipelineError::Timeout(deadline)),
    }
}
