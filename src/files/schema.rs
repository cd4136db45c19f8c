use serde::{Deserialize, Serialize};

/// Which upload directory a stored file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Video,
    Material,
}

impl FileKind {
    /// Route prefix the file is served from.
    pub fn url_prefix(self) -> &'static str {
        match self {
            FileKind::Video => "/api/videos",
            FileKind::Material => "/api/materials",
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            FileKind::Video => "videos",
            FileKind::Material => "materials",
        }
    }

    pub fn url_for(self, stored_name: &str) -> String {
        format!("{}/{}", self.url_prefix(), stored_name)
    }
}

/// Metadata returned after an upload has been written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub size: u64,
    pub upload_date: String,
    pub url: String,
    /// Extracted text; only present for reading materials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One row of the `/api/files` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub filename: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
}

/// Both upload directories, as listed by `/api/files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileListing {
    pub videos: Vec<FileEntry>,
    pub materials: Vec<FileEntry>,
}
