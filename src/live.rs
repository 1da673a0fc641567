//! Push-updated lists.
//!
//! A [`LiveList`] is seeded with a one-shot [`Repository::list`] and then kept
//! current by a store subscription; every push replaces the whole list. If the
//! subscription cannot be attached or fails later, the last list stays visible
//! and no retry is made.

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::repo::{Entity, Repository, Scope};
use crate::store::SnapshotStream;

pub struct LiveList<E: Entity> {
    receiver: watch::Receiver<Vec<E>>,
    task: Option<JoinHandle<()>>,
}

impl<E: Entity> LiveList<E> {
    pub async fn start(repo: &Repository<E>, scope: Scope) -> Self {
        let seed = repo.list(&scope).await;
        let (sender, receiver) = watch::channel(seed);

        let query = scope.to_query(E::CREATED_FIELD);
        let task = match repo.store().subscribe(E::COLLECTION, query).await {
            Ok(stream) => Some(tokio::spawn(forward(stream, sender))),
            Err(e) => {
                tracing::warn!(
                    "Error subscribing to {}, keeping the initial list: {e}",
                    E::COLLECTION
                );
                None
            }
        };

        Self { receiver, task }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Vec<E> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next push. Returns false once delivery has ended.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Whether pushes may still arrive.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop delivery and release the remote listener. Later calls do nothing.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Live {} list cancelled", E::COLLECTION);
        }
    }
}

impl<E: Entity> Drop for LiveList<E> {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn forward<E: Entity>(mut stream: SnapshotStream, sender: watch::Sender<Vec<E>>) {
    while let Some(next) = stream.next().await {
        match next {
            Ok(documents) => {
                let items: Vec<E> = documents.iter().map(E::from_document).collect();
                if sender.send(items).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Live {} subscription failed, keeping the last list: {e}",
                    E::COLLECTION
                );
                break;
            }
        }
    }
}
