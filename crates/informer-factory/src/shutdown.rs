//! Stop coordination for running informers.
//!
//! Every informer task spawned by the factory holds a [`RunGuard`]; stopping
//! the controller broadcasts the stop signal and waits until all guards are
//! dropped or the grace period runs out.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use informer_cache::StopReceiver;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

/// Controller for stopping every informer of a factory.
#[derive(Debug, Clone)]
pub struct StopController {
    inner: Arc<StopInner>,
}

#[derive(Debug)]
struct StopInner {
    initiated: AtomicBool,
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
    running: AtomicUsize,
}

impl Default for StopController {
    fn default() -> Self {
        Self::new()
    }
}

impl StopController {
    /// Create a new stop controller.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            inner: Arc::new(StopInner {
                initiated: AtomicBool::new(false),
                tx,
                rx,
                running: AtomicUsize::new(0),
            }),
        }
    }

    /// Receiver that observes the stop signal.
    pub fn subscribe(&self) -> StopReceiver {
        self.inner.rx.clone()
    }

    /// Whether stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.inner.initiated.load(Ordering::SeqCst)
    }

    /// Signal every informer to stop and wait for them to finish.
    ///
    /// Returns `true` if all informers stopped within `grace_period`.
    pub async fn stop(&self, grace_period: Duration) -> bool {
        if self
            .inner
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return self.running() == 0;
        }

        info!(running = self.running(), "stopping informers, grace period {:?}", grace_period);
        let _ = self.inner.tx.send(true);

        match timeout(grace_period, self.wait_for_completion()).await {
            Ok(()) => {
                info!("all informers stopped");
                true
            }
            Err(_) => {
                warn!(
                    remaining = self.running(),
                    "informers still running after grace period"
                );
                false
            }
        }
    }

    async fn wait_for_completion(&self) {
        while self.running() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Register a running informer task.
    pub fn register_run(&self) -> RunGuard {
        self.inner.running.fetch_add(1, Ordering::SeqCst);
        RunGuard {
            controller: self.clone(),
        }
    }

    /// Number of informer tasks still running.
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::SeqCst)
    }
}

/// Marks an informer task as running until dropped.
#[derive(Debug)]
pub struct RunGuard {
    controller: StopController,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.controller.inner.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C elsewhere).
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("received Ctrl+C");
    }

    Ok(())
}
