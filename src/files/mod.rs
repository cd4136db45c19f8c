//! Uploaded files: on-disk storage for videos and reading materials,
//! and text extraction for the materials.

pub mod extract;
pub mod schema;
pub mod storage;

pub use extract::{DocumentFormat, ExtractError};
pub use schema::{FileEntry, FileKind, FileListing, StoredFile};
pub use storage::{FileStorage, PendingUpload};

/// Extensions accepted by `/api/upload/video`.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm"];

/// Lowercased extension of a file name, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

pub fn is_video_name(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Guess the MIME type served for a stored file from its extension.
pub fn guess_mime_type(filename: &str) -> &'static str {
    match extension_of(filename).as_deref().unwrap_or("") {
        "txt" => "text/plain; charset=utf-8",
        "rtf" => "application/rtf",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        _ => "application/octet-stream",
    }
}
