use std::path::PathBuf;

use crate::error::{GalleryError, Result};

#[derive(Debug, Clone)]
pub struct GalleryPaths {
    pub config_dir: PathBuf,
}

impl GalleryPaths {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GalleryError::Config("cannot resolve XDG config dir".into()))?
            .join("gallery");

        Ok(Self { config_dir })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }
}
