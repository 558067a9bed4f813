use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::controller::{Gallery, Message};
use crate::task::Task;

/// Runs `task` and everything it spawns, applying completions in the order they
/// arrive, until no work is left.
pub async fn run_until_idle(gallery: &mut Gallery, task: Task<Message>) {
    let mut pending = JoinSet::new();
    spawn_all(&mut pending, task);

    while let Some(joined) = pending.join_next().await {
        match joined {
            Ok(message) => {
                debug!(?message, "task completed");
                let next = gallery.update(message);
                spawn_all(&mut pending, next);
            }
            Err(e) => warn!("gallery task aborted: {e}"),
        }
    }
}

/// Feeds `messages` through `update` one after another, draining the work each
/// one starts before moving on.
pub async fn drive(gallery: &mut Gallery, messages: impl IntoIterator<Item = Message>) {
    for message in messages {
        let task = gallery.update(message);
        run_until_idle(gallery, task).await;
    }
}

fn spawn_all(pending: &mut JoinSet<Message>, task: Task<Message>) {
    for future in task.into_futures() {
        pending.spawn(future);
    }
}
