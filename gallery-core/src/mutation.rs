use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::controller::Message;
use crate::error::Result;
use crate::models::{Image, ImageId, ImageUpdate, NewImage};
use crate::service::{Confirm, ImageService};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update(ImageId),
    Delete(ImageId),
}

/// `Idle -> InFlight -> {Succeeded -> ReloadPending -> Idle, Failed -> Idle}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    InFlight,
    Succeeded,
    ReloadPending,
    Failed,
}

/// Phase of every outstanding mutation request. Requests are independent:
/// nothing is queued or coalesced.
#[derive(Debug, Default)]
pub struct MutationTracker {
    next_id: u64,
    requests: HashMap<RequestId, (MutationKind, MutationPhase)>,
}

impl MutationTracker {
    pub fn begin(&mut self, kind: MutationKind) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.requests.insert(id, (kind, MutationPhase::InFlight));
        debug!(request = %id, ?kind, "mutation in flight");
        id
    }

    /// Records the server's answer. A failed request returns to idle at once.
    pub fn complete(&mut self, id: RequestId, ok: bool) {
        if ok {
            self.set(id, MutationPhase::Succeeded);
        } else {
            self.set(id, MutationPhase::Failed);
            self.requests.remove(&id);
        }
    }

    pub fn reload_started(&mut self, id: RequestId) {
        if self.phase(id) == MutationPhase::Succeeded {
            self.set(id, MutationPhase::ReloadPending);
        }
    }

    pub fn reload_finished(&mut self, id: RequestId) {
        if self.requests.remove(&id).is_some() {
            debug!(request = %id, "mutation settled");
        }
    }

    pub fn phase(&self, id: RequestId) -> MutationPhase {
        self.requests
            .get(&id)
            .map(|(_, phase)| *phase)
            .unwrap_or(MutationPhase::Idle)
    }

    pub fn kind(&self, id: RequestId) -> Option<MutationKind> {
        self.requests.get(&id).map(|(kind, _)| *kind)
    }

    pub fn in_flight(&self) -> usize {
        self.requests
            .values()
            .filter(|(_, phase)| *phase == MutationPhase::InFlight)
            .count()
    }

    pub fn is_idle(&self) -> bool {
        self.requests.is_empty()
    }

    fn set(&mut self, id: RequestId, phase: MutationPhase) {
        if let Some(entry) = self.requests.get_mut(&id) {
            debug!(request = %id, from = ?entry.1, to = ?phase, "mutation phase");
            entry.1 = phase;
        }
    }
}

/// Images and tags fetched together after a mutation.
#[derive(Debug)]
pub struct Reload {
    pub images: Result<Vec<Image>>,
    pub tags: Result<Vec<String>>,
}

/// Issues create/update/delete against the image service and the reload that
/// follows each success.
pub struct MutationCoordinator {
    service: Arc<dyn ImageService>,
    tracker: MutationTracker,
}

impl MutationCoordinator {
    pub fn new(service: Arc<dyn ImageService>) -> Self {
        Self {
            service,
            tracker: MutationTracker::default(),
        }
    }

    pub fn tracker(&self) -> &MutationTracker {
        &self.tracker
    }

    pub fn create(&mut self, upload: NewImage) -> Task<Message> {
        let id = self.tracker.begin(MutationKind::Create);
        let service = Arc::clone(&self.service);
        Task::perform(
            async move { service.create_image(upload).await },
            move |result| Message::Created(id, result),
        )
    }

    pub fn update(&mut self, image: ImageId, update: ImageUpdate) -> Task<Message> {
        let id = self.tracker.begin(MutationKind::Update(image));
        let service = Arc::clone(&self.service);
        Task::perform(
            async move { service.update_image(image, &update).await },
            move |result| Message::Updated(id, image, result),
        )
    }

    /// Asks `confirm` first. Declining dispatches nothing.
    pub fn delete(&mut self, image: ImageId, title: &str, confirm: &dyn Confirm) -> Task<Message> {
        let prompt = format!("Delete \"{title}\"? This cannot be undone.");
        if !confirm.confirm(&prompt) {
            debug!(%image, "delete declined");
            return Task::none();
        }
        let id = self.tracker.begin(MutationKind::Delete(image));
        let service = Arc::clone(&self.service);
        Task::perform(
            async move { service.delete_image(image).await },
            move |result| Message::Deleted(id, image, result),
        )
    }

    /// Records the outcome and, on success, starts the full reload.
    pub fn settle(&mut self, id: RequestId, ok: bool) -> Task<Message> {
        self.tracker.complete(id, ok);
        if !ok {
            return Task::none();
        }
        info!(request = %id, "mutation succeeded, reloading");
        self.tracker.reload_started(id);
        self.reload(Some(id))
    }

    pub fn reload(&self, after: Option<RequestId>) -> Task<Message> {
        let service = Arc::clone(&self.service);
        Task::perform(
            async move {
                let (images, tags) = tokio::join!(service.list_images(), service.list_tags());
                Reload { images, tags }
            },
            move |reload| Message::Reloaded(after, reload),
        )
    }

    pub fn reload_finished(&mut self, after: Option<RequestId>) {
        if let Some(id) = after {
            self.tracker.reload_finished(id);
        }
    }
}
