pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Actor, Image, ImageId, ImageUpdate, MutationAck, NewImage};

/// Remote collection of images and their tag vocabulary.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Every image visible to the current session, in server order.
    async fn list_images(&self) -> Result<Vec<Image>>;
    /// Distinct tags across all images.
    async fn list_tags(&self) -> Result<Vec<String>>;
    async fn create_image(&self, upload: NewImage) -> Result<MutationAck>;
    async fn update_image(&self, id: ImageId, update: &ImageUpdate) -> Result<MutationAck>;
    async fn delete_image(&self, id: ImageId) -> Result<MutationAck>;
}

#[async_trait]
pub trait SessionService: Send + Sync {
    /// `None` for an anonymous session.
    async fn current_actor(&self) -> Result<Option<Actor>>;
}

/// Interactive yes/no gate in front of destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Fixed answer, for scripted runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Clone)]
pub struct Services {
    pub images: Arc<dyn ImageService>,
    pub session: Arc<dyn SessionService>,
}

impl Services {
    pub fn new(images: Arc<dyn ImageService>, session: Arc<dyn SessionService>) -> Self {
        Self { images, session }
    }

    /// One backend serving both contracts.
    pub fn from_shared<S>(service: Arc<S>) -> Self
    where
        S: ImageService + SessionService + 'static,
    {
        Self {
            images: service.clone(),
            session: service,
        }
    }
}
