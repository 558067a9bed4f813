//! Projects gallery state into what the page shows. Nothing here mutates state.

pub mod events;
pub mod html;

use url::Url;

use crate::controller::{EditForm, UploadForm};
use crate::models::{Image, ImageId};
use crate::notice::NoticeKind;
use crate::store::GalleryState;
use crate::theme::Theme;

pub const EMPTY_MESSAGE: &str = "No images found";
pub const ALL_TAGS_LABEL: &str = "All tags";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub id: ImageId,
    pub thumbnail_url: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Edit and delete are offered only to the uploader.
    pub owner_controls: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridView {
    Empty { message: String },
    Cells(Vec<GridCell>),
}

impl GridView {
    pub fn cells(&self) -> &[GridCell] {
        match self {
            Self::Empty { .. } => &[],
            Self::Cells(cells) => cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewView {
    pub id: ImageId,
    pub image_url: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created: String,
    pub owner_controls: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOption {
    /// Empty for the "All tags" sentinel.
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeView {
    pub kind: NoticeKind,
    pub text: String,
}

/// Everything on screen at one moment.
#[derive(Debug, Clone)]
pub struct View {
    pub theme: Theme,
    pub search: String,
    pub tag_options: Vec<TagOption>,
    pub grid: GridView,
    pub preview: Option<PreviewView>,
    pub upload: Option<UploadForm>,
    pub edit: Option<EditForm>,
    pub notices: Vec<NoticeView>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    uploads: Url,
}

impl Renderer {
    pub fn new(uploads: Url) -> Self {
        Self { uploads }
    }

    pub fn image_url(&self, filename: &str) -> String {
        self.uploads
            .join(filename)
            .map(String::from)
            .unwrap_or_else(|_| filename.to_string())
    }

    pub fn grid(&self, state: &GalleryState) -> GridView {
        if state.filtered().is_empty() {
            let message = state.load_error().unwrap_or(EMPTY_MESSAGE).to_string();
            return GridView::Empty { message };
        }
        let cells = state
            .filtered()
            .iter()
            .map(|img| GridCell {
                id: img.id,
                thumbnail_url: self.image_url(&img.filename),
                title: img.title.clone(),
                description: non_blank(img),
                tags: img.tags.clone(),
                owner_controls: state.is_owner(img),
            })
            .collect();
        GridView::Cells(cells)
    }

    pub fn preview(&self, state: &GalleryState) -> Option<PreviewView> {
        let img = state.selected_image()?;
        Some(PreviewView {
            id: img.id,
            image_url: self.image_url(&img.filename),
            title: img.title.clone(),
            description: non_blank(img),
            tags: img.tags.clone(),
            created: format_created(&img.created_at),
            owner_controls: state.is_owner(img),
        })
    }

    pub fn tag_options(&self, state: &GalleryState) -> Vec<TagOption> {
        let current = state.criteria().tag.trim().to_lowercase();
        let mut options = vec![TagOption {
            value: String::new(),
            label: ALL_TAGS_LABEL.into(),
            selected: current.is_empty(),
        }];
        options.extend(state.tags().as_slice().iter().map(|tag| TagOption {
            value: tag.clone(),
            label: tag.clone(),
            selected: tag.to_lowercase() == current,
        }));
        options
    }
}

fn non_blank(img: &Image) -> Option<String> {
    img.description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(String::from)
}

/// Human date for a server timestamp; unknown formats are shown as sent.
pub fn format_created(raw: &str) -> String {
    const OUT: &str = "%b %-d, %Y";
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.format(OUT).to_string();
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.format(OUT).to_string();
    }
    raw.to_string()
}
