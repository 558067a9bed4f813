//! Click routing for rendered markup, keyed by `data-action` and `data-image-id`.

use crate::controller::Message;
use crate::models::ImageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Preview,
    Edit,
    Delete,
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "preview" => Ok(Self::Preview),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preview => write!(f, "preview"),
            Self::Edit => write!(f, "edit"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One element on a click's path, reduced to the attributes routing cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    pub action: Option<Action>,
    pub image_id: Option<ImageId>,
}

impl ClickTarget {
    pub fn new(action: Action, image_id: ImageId) -> Self {
        Self {
            action: Some(action),
            image_id: Some(image_id),
        }
    }

    /// Elements without the attributes, or with values we don't know, are inert.
    pub fn from_attributes<'a>(attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut target = Self::default();
        for (name, value) in attrs {
            match name {
                "data-action" => target.action = value.parse().ok(),
                "data-image-id" => target.image_id = value.parse().ok(),
                _ => {}
            }
        }
        target
    }
}

/// Maps a click to a message. `path` runs from the clicked element outwards.
///
/// Edit and delete controls consume the click, so a press on them never also
/// opens the preview of the card they sit in. A control whose image id is
/// missing does nothing.
pub fn route_click(path: &[ClickTarget]) -> Option<Message> {
    for target in path {
        match (target.action, target.image_id) {
            (Some(Action::Edit), Some(id)) => return Some(Message::OpenEdit(id)),
            (Some(Action::Delete), Some(id)) => return Some(Message::Delete(id)),
            (Some(Action::Edit | Action::Delete), None) => return None,
            (Some(Action::Preview), Some(id)) => return Some(Message::ImageClicked(id)),
            _ => continue,
        }
    }
    None
}
