use tokio::sync::watch;

/// Tracks whether the transport is connected and lets tasks wait for it
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Connectivity {
    pub fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self { tx }
    }

    /// Always-connected signal, for in-process transports
    pub fn connected() -> Self {
        Self::new(true)
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn set_connected(&self, connected: bool) {
        self.tx.send_replace(connected);
    }

    /// Resolve once the transport is connected
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|connected| *connected).await;
    }
}
