//! Service modules for the Google Drive API.

mod files;
mod upload;

pub use files::FilesService;
pub use upload::UploadService;
