mod handler;
mod model;

pub use handler::{FILES_FIELD, upload};
pub use model::{UploadResponse, UploadedFile};
