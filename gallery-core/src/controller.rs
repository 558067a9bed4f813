use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};

use crate::config::UiConfig;
use crate::error::Result;
use crate::models::{Image, ImageId, ImageUpdate, MutationAck, NewImage};
use crate::mutation::{MutationCoordinator, MutationTracker, Reload, RequestId};
use crate::notice::Notices;
use crate::render::{NoticeView, Renderer, View};
use crate::service::{Confirm, Services};
use crate::store::GalleryState;
use crate::tags;
use crate::task::Task;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Tags,
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<UploadFile>,
    pub title: String,
    pub description: String,
    pub tags: String,
}

impl UploadForm {
    fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Title => self.title = value,
            FormField::Description => self.description = value,
            FormField::Tags => self.tags = value,
        }
    }

    /// `None` until a file has been chosen.
    pub fn payload(&self) -> Option<NewImage> {
        let file = self.file.as_ref()?;
        Some(NewImage {
            file_name: file.name.clone(),
            content: file.content.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub image_id: ImageId,
    pub title: String,
    pub description: String,
    /// Comma-delimited, as the user edits it.
    pub tags: String,
}

impl EditForm {
    pub fn for_image(image: &Image) -> Self {
        Self {
            image_id: image.id,
            title: image.title.clone(),
            description: image.description.clone().unwrap_or_default(),
            tags: tags::join_tags(&image.tags),
        }
    }

    fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Title => self.title = value,
            FormField::Description => self.description = value,
            FormField::Tags => self.tags = value,
        }
    }

    pub fn payload(&self) -> ImageUpdate {
        ImageUpdate {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Dialogs {
    pub upload_open: bool,
    pub upload: UploadForm,
    pub edit: Option<EditForm>,
    pub preview_open: bool,
}

#[derive(Debug)]
pub enum Message {
    // startup
    Loaded(Box<GalleryState>),
    Refresh,

    // filtering
    SearchChanged(String),
    SearchSettled(u64),
    TagSelected(String),

    // preview
    ImageClicked(ImageId),
    ClosePreview,

    // upload dialog
    OpenUpload,
    CloseUpload,
    UploadFileChosen(UploadFile),
    UploadFieldChanged(FormField, String),
    SubmitUpload,

    // edit dialog
    OpenEdit(ImageId),
    CloseEdit,
    EditFieldChanged(FormField, String),
    SubmitEdit,

    Delete(ImageId),

    // completions
    Created(RequestId, Result<MutationAck>),
    Updated(RequestId, ImageId, Result<MutationAck>),
    Deleted(RequestId, ImageId, Result<MutationAck>),
    Reloaded(Option<RequestId>, Reload),

    ThemeChanged(Theme),
    /// A notice reached the end of its display time.
    NoticeExpired,
}

/// The gallery page: owns the state store and hands it to the render engine and
/// the mutation coordinator.
pub struct Gallery {
    state: GalleryState,
    dialogs: Dialogs,
    notices: Notices,
    coordinator: MutationCoordinator,
    confirm: Arc<dyn Confirm>,
    renderer: Renderer,
    theme: Theme,
    search_input: String,
    search_generation: u64,
    search_debounce: Duration,
    auto_dismiss: bool,
}

impl Gallery {
    pub fn new(
        services: Services,
        confirm: Arc<dyn Confirm>,
        renderer: Renderer,
        ui: &UiConfig,
    ) -> (Self, Task<Message>) {
        let gallery = Self {
            state: GalleryState::new(),
            dialogs: Dialogs::default(),
            notices: Notices::new(ui.notice_ttl()),
            coordinator: MutationCoordinator::new(Arc::clone(&services.images)),
            confirm,
            renderer,
            theme: ui.theme,
            search_input: String::new(),
            search_generation: 0,
            search_debounce: ui.search_debounce(),
            auto_dismiss: ui.auto_dismiss,
        };

        let Services { images, session } = services;
        let boot = Task::perform(
            async move { GalleryState::initialize(images.as_ref(), session.as_ref()).await },
            |state| Message::Loaded(Box::new(state)),
        );

        (gallery, boot)
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        self.notices.prune();
        let raised = self.notices.raised();

        let task = self.handle(message);

        if self.auto_dismiss && self.notices.raised() > raised {
            let ttl = self.notices.ttl();
            let expiry = Task::perform(tokio::time::sleep(ttl), |_| Message::NoticeExpired);
            return Task::batch([task, expiry]);
        }
        task
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Loaded(loaded) => {
                // keep whatever was typed while the first load was in flight
                let criteria = self.state.criteria().clone();
                self.state = *loaded;
                if !criteria.is_empty() {
                    self.state.set_criteria(criteria);
                }
                if let Some(err) = self.state.load_error() {
                    self.notices.error(err);
                }
                info!(images = self.state.images().len(), "gallery loaded");
                Task::none()
            }

            Message::Refresh => self.coordinator.reload(None),

            Message::SearchChanged(text) => {
                self.search_input = text;
                if self.search_debounce.is_zero() {
                    self.state.set_search(self.search_input.clone());
                    return Task::none();
                }
                self.search_generation += 1;
                let gen = self.search_generation;
                let delay = self.search_debounce;
                Task::perform(
                    async move {
                        tokio::time::sleep(delay).await;
                        gen
                    },
                    Message::SearchSettled,
                )
            }

            Message::SearchSettled(gen) => {
                if gen == self.search_generation {
                    self.state.set_search(self.search_input.clone());
                }
                Task::none()
            }

            Message::TagSelected(tag) => {
                self.state.set_tag(tag);
                Task::none()
            }

            Message::ImageClicked(id) => {
                self.dialogs.preview_open = self.state.set_selected(id);
                Task::none()
            }

            Message::ClosePreview => {
                self.dialogs.preview_open = false;
                if self.dialogs.edit.is_none() {
                    self.state.clear_selected();
                }
                Task::none()
            }

            Message::OpenUpload => {
                self.dialogs.upload_open = true;
                Task::none()
            }

            Message::CloseUpload => {
                self.dialogs.upload_open = false;
                Task::none()
            }

            Message::UploadFileChosen(file) => {
                self.dialogs.upload.file = Some(file);
                Task::none()
            }

            Message::UploadFieldChanged(field, value) => {
                self.dialogs.upload.set(field, value);
                Task::none()
            }

            Message::SubmitUpload => match self.dialogs.upload.payload() {
                Some(payload) => self.coordinator.create(payload),
                None => {
                    self.notices.error("No file selected");
                    Task::none()
                }
            },

            Message::OpenEdit(id) => {
                if let Some(form) = self.state.find(id).map(EditForm::for_image) {
                    self.dialogs.edit = Some(form);
                    self.state.set_selected(id);
                }
                Task::none()
            }

            Message::CloseEdit => {
                self.dialogs.edit = None;
                Task::none()
            }

            Message::EditFieldChanged(field, value) => {
                if let Some(form) = self.dialogs.edit.as_mut() {
                    form.set(field, value);
                }
                Task::none()
            }

            Message::SubmitEdit => match &self.dialogs.edit {
                Some(form) => {
                    let (id, payload) = (form.image_id, form.payload());
                    self.coordinator.update(id, payload)
                }
                None => Task::none(),
            },

            Message::Delete(id) => {
                let title = self
                    .state
                    .find(id)
                    .map(|img| img.title.clone())
                    .unwrap_or_else(|| format!("image {id}"));
                self.coordinator.delete(id, &title, self.confirm.as_ref())
            }

            Message::Created(request, result) => match result {
                Ok(ack) => {
                    self.notices
                        .success(ack.message.unwrap_or_else(|| "Image uploaded successfully".into()));
                    self.dialogs.upload_open = false;
                    self.dialogs.upload = UploadForm::default();
                    self.coordinator.settle(request, true)
                }
                Err(e) => {
                    warn!(%request, "upload failed: {e}");
                    self.notices.error(e.notice_text("Upload failed"));
                    self.coordinator.settle(request, false)
                }
            },

            Message::Updated(request, id, result) => match result {
                Ok(ack) => {
                    self.notices
                        .success(ack.message.unwrap_or_else(|| "Image updated successfully".into()));
                    if self.dialogs.edit.as_ref().map(|f| f.image_id) == Some(id) {
                        self.dialogs.edit = None;
                    }
                    self.close_preview_of(id);
                    self.coordinator.settle(request, true)
                }
                Err(e) => {
                    warn!(%request, %id, "update failed: {e}");
                    self.notices.error(e.notice_text("Update failed"));
                    self.coordinator.settle(request, false)
                }
            },

            Message::Deleted(request, id, result) => match result {
                Ok(ack) => {
                    self.notices
                        .success(ack.message.unwrap_or_else(|| "Image deleted successfully".into()));
                    if self.dialogs.edit.as_ref().map(|f| f.image_id) == Some(id) {
                        self.dialogs.edit = None;
                    }
                    self.close_preview_of(id);
                    self.coordinator.settle(request, true)
                }
                Err(e) => {
                    warn!(%request, %id, "delete failed: {e}");
                    self.notices.error(e.notice_text("Delete failed"));
                    self.coordinator.settle(request, false)
                }
            },

            Message::Reloaded(after, reload) => {
                match reload.images {
                    Ok(images) => {
                        self.state.clear_load_error();
                        self.state.replace_collection(images);
                        // tags only follow a collection that was actually replaced
                        match reload.tags {
                            Ok(tags) => self.state.replace_tags(tags),
                            Err(e) => warn!("tag reload failed: {e}"),
                        }
                    }
                    Err(e) => {
                        warn!("reload failed: {e}");
                        self.notices.error(e.notice_text("Failed to refresh images"));
                    }
                }
                if self.state.selected().is_none() {
                    self.dialogs.preview_open = false;
                }
                self.coordinator.reload_finished(after);
                Task::none()
            }

            Message::ThemeChanged(theme) => {
                self.theme = theme;
                Task::none()
            }

            // expired notices were pruned on entry
            Message::NoticeExpired => Task::none(),
        }
    }

    fn close_preview_of(&mut self, id: ImageId) {
        if self.state.selected() == Some(id) {
            self.dialogs.preview_open = false;
            if self.dialogs.edit.is_none() {
                self.state.clear_selected();
            }
        }
    }

    pub fn view(&self) -> View {
        View {
            theme: self.theme,
            search: self.search_input.clone(),
            tag_options: self.renderer.tag_options(&self.state),
            grid: self.renderer.grid(&self.state),
            preview: if self.dialogs.preview_open {
                self.renderer.preview(&self.state)
            } else {
                None
            },
            upload: self
                .dialogs
                .upload_open
                .then(|| self.dialogs.upload.clone()),
            edit: self.dialogs.edit.clone(),
            notices: self
                .notices
                .visible()
                .map(|n| NoticeView {
                    kind: n.kind,
                    text: n.text.clone(),
                })
                .collect(),
        }
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn dialogs(&self) -> &Dialogs {
        &self.dialogs
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn mutations(&self) -> &MutationTracker {
        self.coordinator.tracker()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }
}
