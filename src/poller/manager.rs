// src/poller/manager.rs
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{PollStats, Poller};
use crate::config::Config;
use crate::domain::{Hit, Profile, Store};
use crate::scoring::Engine;

/// Spawns one poller task per configured CT log and coordinates their
/// shutdown. All pollers share the scorer, store, profile, and output
/// channels.
pub struct Manager {
    cfg: Arc<Config>,
    scorer: Engine,
    store: Arc<dyn Store>,
    profile: Arc<Profile>,
    session: String,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Manager {
    pub fn new(
        cfg: Arc<Config>,
        scorer: Engine,
        store: Arc<dyn Store>,
        profile: Arc<Profile>,
        session: String,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Manager {
            cfg,
            scorer,
            store,
            profile,
            session,
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a polling task for every configured log and return. Pollers
    /// run until `stop` is called. `discard_tx` may be None to skip
    /// zero-score reporting.
    pub async fn start(
        &self,
        hit_tx: mpsc::Sender<Hit>,
        stats_tx: mpsc::Sender<PollStats>,
        discard_tx: Option<mpsc::Sender<String>>,
    ) {
        let mut handles = self.handles.lock().await;

        for log in &self.cfg.ct_logs {
            let poller = match Poller::new(
                &log.url,
                &log.name,
                self.scorer,
                Arc::clone(&self.store),
                Arc::clone(&self.profile),
                self.session.clone(),
                self.cfg.batch_size,
                self.cfg.poll_interval,
                self.cfg.backtrack,
                hit_tx.clone(),
                stats_tx.clone(),
                discard_tx.clone(),
            ) {
                Ok(poller) => poller,
                Err(e) => {
                    error!(log = %log.url, error = %e, "failed to create poller");
                    continue;
                }
            };

            let shutdown_rx = self.shutdown_tx.subscribe();
            let log_name = log.name.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = poller.run(shutdown_rx).await {
                    error!(log = %log_name, error = %e, "poller exited with error");
                }
            }));
        }

        info!(count = handles.len(), "started pollers");
    }

    /// Signal shutdown and wait for every poller to exit. Idempotent and
    /// safe to call before `start`.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "poller task panicked");
            }
        }
        info!("all pollers stopped");
    }
}
