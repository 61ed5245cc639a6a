//! Inbox channel: every async result reaches the reducer through here.

use tokio::sync::{mpsc, watch};

use crate::events::UiEvent;

pub type UiEventSender = mpsc::UnboundedSender<UiEvent>;
pub type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Forwards every value of an mpsc queue as a `UiEvent` until either side closes.
pub fn forward_queue<T, F>(mut rx: mpsc::UnboundedReceiver<T>, tx: UiEventSender, wrap: F)
where
    T: Send + 'static,
    F: Fn(T) -> UiEvent + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(value) = rx.recv().await {
            if tx.send(wrap(value)).is_err() {
                break;
            }
        }
    });
}

/// Forwards the current value of a watch channel and every change after it.
pub fn forward_watch<T, F>(mut rx: watch::Receiver<T>, tx: UiEventSender, wrap: F)
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> UiEvent + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let value = rx.borrow_and_update().clone();
            if tx.send(wrap(value)).is_err() || rx.changed().await.is_err() {
                break;
            }
        }
    });
}
