//! Cooperative cancellation for price streams.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// A token that can be used to cancel a stream.
///
/// Clone-able and thread-safe for sharing across async tasks. Every clone
/// observes the same flag; once cancelled, a token stays cancelled.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until the token is cancelled.
    pub async fn cancelled(&self) {
        self.cancelled_owned().await
    }

    /// Like [`cancelled`](Self::cancelled), but the returned future does not
    /// borrow the token and can be stored.
    pub fn cancelled_owned(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
                // Sender gone: nobody can cancel any more.
                std::future::pending::<()>().await;
            }
        }
    }
}
