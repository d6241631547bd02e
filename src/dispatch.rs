// Main queue: runs slow work off the worker task and posts the completion back onto it.

use crate::bus::NotificationBus;
use std::future::Future;
use tokio::sync::mpsc;

/// Continuation applied on the worker task with exclusive access to the bus.
pub type Completion = Box<dyn FnOnce(&mut NotificationBus) + Send>;

#[derive(Clone)]
pub struct MainQueue {
    tx: mpsc::UnboundedSender<Completion>,
}

impl MainQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Spawns `work` on the runtime; once it resolves, `on_main` is queued for
    /// the worker task together with the output. If the worker is gone the
    /// result is dropped.
    pub fn run_async<T, Fut, F>(&self, work: Fut, on_main: F)
    where
        T: Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        F: FnOnce(T, &mut NotificationBus) + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let output = work.await;
            if tx
                .send(Box::new(move |bus: &mut NotificationBus| on_main(output, bus)))
                .is_err()
            {
                tracing::debug!("main queue closed; dropping completion");
            }
        });
    }
}
