// Push side of the dashboard: row-insert notifications on the snapshot table

use crate::snapshot::LiquiditySnapshot;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod realtime;
pub mod realtime_types;

/// How long `close` waits for the feed to unsubscribe before aborting it.
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("live channel not configured: {0}")]
    Config(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("subscription rejected: {0}")]
    Rejected(String),
}

/// A source of newly inserted snapshots.
#[async_trait::async_trait]
pub trait LiveFeed: Send + Sync + 'static {
    /// Deliver one snapshot per insert notification into `tx` until `stop` flips to `true`,
    /// the connection ends, or the receiver is dropped.
    async fn run(&self, tx: mpsc::Sender<LiquiditySnapshot>, stop: watch::Receiver<bool>) -> Result<(), LiveError>;
}

/// Receiving end of a running feed. Dropping it without `close` leaves the feed task to
/// notice the closed channel on its next delivery.
pub struct LiveSubscription {
    updates: mpsc::Receiver<LiquiditySnapshot>,
    stop: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl LiveSubscription {
    /// Wrap a plain receiver that has no feed task behind it.
    pub fn detached(updates: mpsc::Receiver<LiquiditySnapshot>) -> Self {
        Self { updates, stop: None, task: None }
    }

    pub async fn recv(&mut self) -> Option<LiquiditySnapshot> {
        self.updates.recv().await
    }

    /// Signal the feed to unsubscribe and wait up to `CLOSE_GRACE` for it to finish;
    /// a feed still running after that is aborted.
    pub async fn close(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
        self.updates.close();
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(CLOSE_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Live feed task ended abnormally"),
                Err(_) => {
                    warn!(grace_secs = CLOSE_GRACE.as_secs(), "Live feed ignored stop; aborting");
                    task.abort();
                }
            }
        }
    }
}

/// Spawn `feed` and hand back its subscription.
pub fn subscribe<F: LiveFeed>(feed: F, buffer: usize) -> LiveSubscription {
    let (tx, updates) = mpsc::channel(buffer.max(1));
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        match feed.run(tx, stop_rx).await {
            Ok(()) => info!("Live feed finished"),
            Err(e) => warn!(error = %e, "Live feed stopped"),
        }
    });
    LiveSubscription { updates, stop: Some(stop_tx), task: Some(task) }
}
