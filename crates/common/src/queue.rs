//! Bounded stage queues shared by a pool of workers.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// A receiver that several workers of one pool drain in turn.
pub type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

pub fn shared<T>(rx: mpsc::Receiver<T>) -> SharedReceiver<T> {
    Arc::new(Mutex::new(rx))
}

/// Next queued item, or `None` once cancelled or the queue is closed.
pub async fn pull<T>(input: &SharedReceiver<T>, token: &CancellationToken) -> Option<T> {
    tokio::select! {
        _ = token.cancelled() => None,
        item = async { input.lock().await.recv().await } => item,
    }
}

/// Pushes `item` downstream, waiting while the queue is full. `false` once cancelled or closed.
pub async fn push<T>(output: &mpsc::Sender<T>, item: T, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        sent = output.send(item) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pull_returns_none_on_cancel() {
        let (_tx, rx) = mpsc::channel::<u8>(1);
        let rx = shared(rx);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(pull(&rx, &token).await, None);
    }

    #[tokio::test]
    async fn test_pull_returns_none_on_closed_queue() {
        let (tx, rx) = mpsc::channel::<u8>(1);
        let rx = shared(rx);
        tx.send(3).await.unwrap();
        drop(tx);
        let token = CancellationToken::new();
        assert_eq!(pull(&rx, &token).await, Some(3));
        assert_eq!(pull(&rx, &token).await, None);
    }

    #[tokio::test]
    async fn test_pool_members_share_one_queue() {
        let (tx, rx) = mpsc::channel::<u32>(4);
        let rx = shared(rx);
        let token = CancellationToken::new();
        for i in 0..4 {
            tx.send(i).await.unwrap();
        }
        drop(tx);

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let (rx, token) = (rx.clone(), token.clone());
                tokio::spawn(async move {
                    let mut got = Vec::new();
                    while let Some(v) = pull(&rx, &token).await {
                        got.push(v);
                    }
                    got
                })
            })
            .collect();

        let mut all = Vec::new();
        for w in workers {
            all.extend(w.await.unwrap());
        }
        all.sort();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_push_gives_up_on_full_queue_when_cancelled() {
        let (tx, _rx) = mpsc::channel::<u8>(1);
        let token = CancellationToken::new();
        assert!(push(&tx, 1, &token).await);

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });
        assert!(!push(&tx, 2, &token).await);
    }
}
