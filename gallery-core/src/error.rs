use std::path::PathBuf;

use crate::models::ImageId;

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a structured error (validation, ownership, ...).
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("not authenticated")]
    Unauthenticated,

    #[error("image not found: {0}")]
    ImageNotFound(ImageId),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
}

impl GalleryError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Request never produced a server answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Transport(_) | Self::Io(_))
    }

    /// Text for an error notice: the server's message when it sent one.
    pub fn notice_text(&self, fallback: &str) -> String {
        match self {
            Self::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text_prefers_server_message() {
        let err = GalleryError::rejected(403, "Unauthorized");
        assert_eq!(err.notice_text("Delete failed"), "Unauthorized");
    }

    #[test]
    fn test_notice_text_falls_back() {
        let err = GalleryError::Transport("connection refused".into());
        assert!(err.is_transport());
        assert_eq!(err.notice_text("Delete failed"), "Delete failed");

        let blank = GalleryError::rejected(500, "  ");
        assert_eq!(blank.notice_text("Update failed"), "Update failed");
    }
}
