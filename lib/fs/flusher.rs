use crate::fs::BlockStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// periodic [`BlockStore::flush`] on the tokio runtime
pub struct Flusher {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Flusher {
    /// must be called from within a tokio runtime
    pub fn spawn(store: Arc<BlockStore>, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = tick.tick() => flush_once(&store).await,
                    _ = stop_rx.changed() => break,
                }
            }
            flush_once(&store).await;
            log::info!("flusher stopped");
        });
        log::info!("flusher started, interval {:?}", interval);
        Self { stop_tx, handle }
    }

    /// stop ticking and run one last flush
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            log::error!("flusher task fail, error {}", e);
        }
    }
}

async fn flush_once(store: &Arc<BlockStore>) {
    let s = store.clone();
    match tokio::task::spawn_blocking(move || s.flush()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => log::error!("background flush fail, error {}", e),
        Err(e) => log::error!("background flush task fail, error {}", e),
    }
}
