//! In-process image service applying the same rules as the gallery server.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{ImageService, SessionService};
use crate::error::{GalleryError, Result};
use crate::models::{Actor, Image, ImageId, ImageUpdate, MutationAck, NewImage, UserId};
use crate::tags;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Default)]
struct Inner {
    /// Newest first, as the server lists them.
    images: Vec<Image>,
    next_id: i64,
    actor: Option<Actor>,
    offline: bool,
}

#[derive(Debug, Default)]
pub struct MemoryService {
    inner: Mutex<Inner>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `images` in listing order.
    pub fn with_images(images: Vec<Image>) -> Self {
        let next_id = images.iter().map(|i| i.id.get()).max().unwrap_or(0) + 1;
        Self {
            inner: Mutex::new(Inner {
                images,
                next_id,
                actor: None,
                offline: false,
            }),
        }
    }

    pub fn sign_in(&self, actor: Actor) {
        self.lock().actor = Some(actor);
    }

    /// While offline every call fails as a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn snapshot(&self) -> Vec<Image> {
        self.lock().images.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn online(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.offline {
            return Err(GalleryError::Transport("connection refused".into()));
        }
        Ok(inner)
    }
}

fn require_actor(inner: &Inner) -> Result<UserId> {
    inner
        .actor
        .as_ref()
        .map(|a| a.id)
        .ok_or(GalleryError::Unauthenticated)
}

fn owned_index(inner: &Inner, id: ImageId) -> Result<usize> {
    let actor = require_actor(inner)?;
    let idx = inner
        .images
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| GalleryError::rejected(404, "Image not found"))?;
    if inner.images[idx].uploaded_by != Some(actor) {
        return Err(GalleryError::rejected(403, "Unauthorized"));
    }
    Ok(idx)
}

pub fn allowed_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl ImageService for MemoryService {
    async fn list_images(&self) -> Result<Vec<Image>> {
        let inner = self.online()?;
        require_actor(&inner)?;
        Ok(inner.images.clone())
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let inner = self.online()?;
        require_actor(&inner)?;
        Ok(tags::vocabulary(&inner.images))
    }

    async fn create_image(&self, upload: NewImage) -> Result<MutationAck> {
        let mut inner = self.online()?;
        let owner = require_actor(&inner)?;

        if upload.file_name.is_empty() || upload.content.is_empty() {
            return Err(GalleryError::rejected(400, "No file selected"));
        }
        // creation checks the title as sent; only updates trim it
        if upload.title.is_empty() {
            return Err(GalleryError::rejected(400, "Title is required"));
        }
        if !allowed_file(&upload.file_name) {
            return Err(GalleryError::rejected(400, "Invalid file type"));
        }

        let id = ImageId::new(inner.next_id);
        inner.next_id += 1;
        let ext = upload
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let image = Image {
            id,
            filename: format!("{id}.{ext}"),
            title: upload.title,
            description: Some(upload.description),
            tags: tags::split_tags(&upload.tags),
            uploaded_by: Some(owner),
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        debug!(%id, "memory service stored image");
        inner.images.insert(0, image);
        Ok(MutationAck::with_message("Image uploaded successfully"))
    }

    async fn update_image(&self, id: ImageId, update: &ImageUpdate) -> Result<MutationAck> {
        let mut inner = self.online()?;
        let idx = owned_index(&inner, id)?;

        let title = update.title.trim();
        if title.is_empty() {
            return Err(GalleryError::rejected(400, "Title is required"));
        }
        let image = &mut inner.images[idx];
        image.title = title.to_string();
        image.description = Some(update.description.trim().to_string());
        image.tags = tags::split_tags(&update.tags);
        Ok(MutationAck::with_message("Image updated successfully"))
    }

    async fn delete_image(&self, id: ImageId) -> Result<MutationAck> {
        let mut inner = self.online()?;
        let idx = owned_index(&inner, id)?;
        inner.images.remove(idx);
        Ok(MutationAck::with_message("Image deleted successfully"))
    }
}

#[async_trait]
impl SessionService for MemoryService {
    async fn current_actor(&self) -> Result<Option<Actor>> {
        let inner = self.online()?;
        Ok(inner.actor.clone())
    }
}
