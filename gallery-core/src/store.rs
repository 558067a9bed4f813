use tracing::{debug, warn};

use crate::error::{GalleryError, Result};
use crate::filter::{self, FilterCriteria};
use crate::models::{Actor, Image, ImageId, TagVocabulary};
use crate::service::{ImageService, SessionService};

/// Result of the startup fetch. Each part fails independently.
#[derive(Debug)]
pub struct Snapshot {
    pub actor: Result<Option<Actor>>,
    pub images: Result<Vec<Image>>,
    pub tags: Result<Vec<String>>,
}

impl Snapshot {
    pub async fn fetch(images: &dyn ImageService, session: &dyn SessionService) -> Self {
        let (actor, list, tags) = tokio::join!(
            session.current_actor(),
            images.list_images(),
            images.list_tags()
        );
        Self {
            actor,
            images: list,
            tags,
        }
    }
}

/// Single source of truth for what the gallery shows.
#[derive(Debug, Default)]
pub struct GalleryState {
    images: Vec<Image>,
    filtered: Vec<Image>,
    tags: TagVocabulary,
    actor: Option<Actor>,
    criteria: FilterCriteria,
    selected: Option<ImageId>,
    load_error: Option<String>,
}

impl GalleryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn initialize(images: &dyn ImageService, session: &dyn SessionService) -> Self {
        let mut state = Self::new();
        state.apply_snapshot(Snapshot::fetch(images, session).await);
        state
    }

    /// Install a startup snapshot. Returns the load error, if the collection failed.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Option<&str> {
        self.actor = match snapshot.actor {
            Ok(actor) => actor,
            Err(e) => {
                warn!("actor lookup failed, continuing anonymous: {e}");
                None
            }
        };
        match snapshot.tags {
            Ok(tags) => self.replace_tags(tags),
            Err(e) => {
                warn!("tag vocabulary unavailable: {e}");
                self.replace_tags(Vec::new());
            }
        }
        match snapshot.images {
            Ok(images) => {
                self.load_error = None;
                self.replace_collection(images);
            }
            Err(e) => {
                warn!("image collection unavailable: {e}");
                self.load_error = Some(load_error_text(&e));
                self.replace_collection(Vec::new());
            }
        }
        self.load_error.as_deref()
    }

    pub fn replace_collection(&mut self, images: Vec<Image>) {
        self.images = images;
        if let Some(id) = self.selected {
            if self.find(id).is_none() {
                self.selected = None;
            }
        }
        self.refilter();
    }

    pub fn replace_tags(&mut self, tags: Vec<String>) {
        self.tags = TagVocabulary::new(tags);
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refilter();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.criteria.search = search.into();
        self.refilter();
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.criteria.tag = tag.into();
        self.refilter();
    }

    /// Selects `id` when it is in the collection, otherwise clears the selection.
    pub fn set_selected(&mut self, id: ImageId) -> bool {
        self.selected = self.find(id).map(|img| img.id);
        self.selected.is_some()
    }

    pub fn clear_selected(&mut self) {
        self.selected = None;
    }

    pub fn clear_load_error(&mut self) {
        self.load_error = None;
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn filtered(&self) -> &[Image] {
        &self.filtered
    }

    pub fn tags(&self) -> &TagVocabulary {
        &self.tags
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn selected(&self) -> Option<ImageId> {
        self.selected
    }

    pub fn selected_image(&self) -> Option<&Image> {
        self.selected.and_then(|id| self.find(id))
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn find(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn is_owner(&self, image: &Image) -> bool {
        image.is_owned_by(self.actor.as_ref())
    }

    fn refilter(&mut self) {
        self.filtered = filter::filter(&self.images, &self.criteria);
        debug!(
            total = self.images.len(),
            shown = self.filtered.len(),
            "filtered view recomputed"
        );
    }
}

fn load_error_text(err: &GalleryError) -> String {
    match err {
        GalleryError::Unauthenticated => "Please log in to view images".into(),
        other => other.notice_text("Failed to load images"),
    }
}
