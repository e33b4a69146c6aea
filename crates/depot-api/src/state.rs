//! Application state shared by handlers

use std::sync::Arc;

use depot_files::FileService;
use depot_images::VariantResolver;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub files: Arc<FileService>,
    pub resolver: Arc<VariantResolver>,
}

impl AppState {
    pub fn new(files: Arc<FileService>, resolver: Arc<VariantResolver>) -> Self {
        Self { files, resolver }
    }
}
