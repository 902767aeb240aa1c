//! Hand-off point for responses produced off the simulation thread.
//!
//! Network calls such as a highscore check finish on an I/O thread. That
//! thread only owns a [`ResponseSender`]; the simulation owns the
//! [`ResponseInbox`] and applies whatever arrived at the start of each tick,
//! in arrival order.

use rapier2d::crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::EngineError;

/// An already-resolved result of an external request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExternalResponse {
    HighscoreChecked { new_highscore: bool },
    SyncFailed { reason: String },
}

/// Producer half. Not `Clone`: a single I/O thread owns it.
#[derive(Debug)]
pub struct ResponseSender {
    tx: Sender<ExternalResponse>,
}

impl ResponseSender {
    pub fn send(&self, response: ExternalResponse) -> Result<(), EngineError> {
        self.tx.send(response).map_err(|_| EngineError::InboxClosed)
    }
}

/// Consumer half, drained by the simulation.
#[derive(Debug)]
pub struct ResponseInbox {
    rx: Receiver<ExternalResponse>,
}

impl ResponseInbox {
    /// Take the responses that arrived before this call.
    ///
    /// Responses sent while draining wait for the next call.
    pub fn drain(&self) -> Vec<ExternalResponse> {
        let ready = self.rx.len();
        let mut out = Vec::with_capacity(ready);
        for _ in 0..ready {
            match self.rx.try_recv() {
                Ok(response) => out.push(response),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("response sender dropped");
                    break;
                }
            }
        }
        out
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// Create a connected sender/inbox pair.
pub fn response_channel() -> (ResponseSender, ResponseInbox) {
    let (tx, rx) = channel::unbounded();
    (ResponseSender { tx }, ResponseInbox { rx })
}
