//! Background task that periodically sweeps expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::cache::TtlCache;

/// Handle to a spawned sweep loop. Dropping the handle does not stop the
/// loop; call [`Sweeper::stop`].
pub struct Sweeper {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a loop that sweeps `cache` every `period`.
    pub fn spawn<V>(cache: Arc<Mutex<TtlCache<V>>>, period: Duration) -> Self
    where
        V: Clone + Send + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh cache is
            // not swept before anything can expire.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.lock().await.sweep();
                        if removed > 0 {
                            debug!(removed, "background sweep");
                        }
                    }
                    _ = signal.notified() => break,
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Signal the loop to exit and wait for it to finish.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
    }
}
