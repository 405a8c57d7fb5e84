//! Run interruption
//!
//! The first interrupt asks VUs to finish their current iteration, a second
//! one abandons them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Shutdown signal types with escalating urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Stop starting iterations, let in-flight ones finish
    Graceful,
    /// Abort in-flight iterations
    Forced,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Graceful => write!(f, "graceful"),
            ShutdownSignal::Forced => write!(f, "forced"),
        }
    }
}

/// Broadcasts shutdown signals to a running engine
#[derive(Debug)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<ShutdownSignal>,
    is_shutting_down: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            sender,
            is_shutting_down: AtomicBool::new(false),
        }
    }

    /// Subscribe to shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.sender.subscribe()
    }

    /// Check if shutdown is in progress
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Acquire)
    }

    /// Send a signal to every subscriber
    pub fn signal(&self, signal: ShutdownSignal) -> Result<usize, ShutdownError> {
        self.is_shutting_down.store(true, Ordering::Release);
        self.sender
            .send(signal)
            .map_err(|_| ShutdownError::BroadcastError)
    }

    /// Escalate: graceful on the first call, forced afterwards
    pub fn interrupt(&self) -> ShutdownSignal {
        let signal = if self.is_shutting_down() {
            ShutdownSignal::Forced
        } else {
            ShutdownSignal::Graceful
        };
        match self.signal(signal) {
            Ok(receivers) => debug!("Sent {} shutdown to {} receivers", signal, receivers),
            Err(_) => debug!("Sent {} shutdown with nobody listening", signal),
        }
        signal
    }

    /// Turn Ctrl+C presses into interrupts until a forced shutdown is sent
    pub fn listen_for_ctrl_c(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Cannot listen for Ctrl+C: {}", e);
                    return;
                }
                match self.interrupt() {
                    ShutdownSignal::Graceful => {
                        info!("Interrupted, stopping VUs (press Ctrl+C again to abort)")
                    }
                    ShutdownSignal::Forced => {
                        warn!("Interrupted again, aborting in-flight iterations");
                        return;
                    }
                }
            }
        })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shutdown error types
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// Broadcast channel error
    #[error("Failed to send shutdown signal")]
    BroadcastError,
}
