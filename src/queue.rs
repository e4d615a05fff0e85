//! The delivery queue shared by every producer and drained by the session.
//!
//! A thin wrapper over a bounded `tokio::sync::mpsc` channel.  Producers
//! hold cloned [`UpdateSender`]s; exactly one [`UpdateReceiver`] is owned by
//! the session loop.  Order within the channel is FIFO; when several
//! producers push at once their interleaving is unspecified.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::update::Update;

/// Capacity used when the config does not name one.
pub const DEFAULT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from pushing into the queue.
#[derive(Debug, Error, PartialEq)]
pub enum QueueError {
    /// The consumer has gone away; no further updates will be delivered.
    #[error("delivery queue is closed")]
    Closed,
}

/// Outcome of a bounded wait on the receiving side.
#[derive(Debug)]
pub enum Recv {
    Update(Update),
    /// Nothing arrived within the wait.
    Timeout,
    /// Every sender has been dropped and the queue is drained.
    Closed,
}

// ---------------------------------------------------------------------------
// Constructor
// ---------------------------------------------------------------------------

/// Create a queue holding at most `capacity` pending updates.
///
/// A capacity of zero is bumped to one.
pub fn bounded(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (UpdateSender { tx }, UpdateReceiver { rx })
}

// ---------------------------------------------------------------------------
// UpdateSender
// ---------------------------------------------------------------------------

/// Producer-side handle.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: mpsc::Sender<Update>,
}

impl UpdateSender {
    /// Push an update, waiting while the queue is full.
    pub async fn send(&self, update: Update) -> Result<(), QueueError> {
        self.tx.send(update).await.map_err(|_| QueueError::Closed)
    }
}

// ---------------------------------------------------------------------------
// UpdateReceiver
// ---------------------------------------------------------------------------

/// Consumer-side handle, owned by the session loop.
#[derive(Debug)]
pub struct UpdateReceiver {
    rx: mpsc::Receiver<Update>,
}

impl UpdateReceiver {
    /// Wait up to `wait` for the next update.
    ///
    /// Cancel-safe: if the returned future is dropped before completion no
    /// update is lost.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Recv {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(update)) => Recv::Update(update),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Timeout,
        }
    }

    /// Take an update if one is already queued.
    pub fn try_recv(&mut self) -> Option<Update> {
        self.rx.try_recv().ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let (tx, mut rx) = bounded(8);
        for v in 0..5 {
            tx.send(Update::untimed("k", v)).await.unwrap();
        }
        for v in 0..5 {
            match rx.recv_timeout(Duration::from_millis(50)).await {
                Recv::Update(u) => assert_eq!(u.value.as_i64(), v),
                other => panic!("expected update, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn empty_queue_times_out() {
        let (_tx, mut rx) = bounded(1);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)).await,
            Recv::Timeout
        ));
    }

    #[tokio::test]
    async fn dropping_every_sender_closes() {
        let (tx, mut rx) = bounded(4);
        let second = tx.clone();
        tx.send(Update::untimed("k", 1)).await.unwrap();
        drop(tx);
        drop(second);

        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)).await,
            Recv::Update(_)
        ));
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)).await,
            Recv::Closed
        ));
    }

    #[tokio::test]
    async fn full_queue_makes_send_wait() {
        let (tx, mut rx) = bounded(1);
        tx.send(Update::untimed("k", 1)).await.unwrap();

        let waiting = tokio::time::timeout(Duration::from_millis(20), tx.send(Update::untimed("k", 2))).await;
        assert!(waiting.is_err(), "second send should wait for room");

        assert!(rx.try_recv().is_some());
        tx.send(Update::untimed("k", 3)).await.unwrap();
        assert_eq!(rx.try_recv().map(|u| u.value.as_i64()), Some(3));
    }

    #[tokio::test]
    async fn send_after_receiver_drop_is_closed() {
        let (tx, rx) = bounded(1);
        drop(rx);
        assert_eq!(tx.send(Update::untimed("k", 1)).await, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn multiple_producers_share_one_queue() {
        let (tx, mut rx) = bounded(16);
        let mut handles = Vec::new();
        for p in 0..4 {
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..3 {
                    tx.send(Update::untimed(format!("p{p}"), i)).await.unwrap();
                }
            }));
        }
        drop(tx);
        for h in handles {
            h.await.unwrap();
        }

        let mut seen = 0;
        while let Recv::Update(_) = rx.recv_timeout(Duration::from_millis(10)).await {
            seen += 1;
        }
        assert_eq!(seen, 12);
    }
}
