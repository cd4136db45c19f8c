use super::schema::{FileEntry, FileKind, StoredFile};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Manages the two flat upload directories (`videos/`, `materials/`).
///
/// Stored names are `<epoch-millis>-<uuid><ext>`, so the upload time can be
/// recovered from the name alone.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(base_dir).to_string();
        Ok(Self {
            base_dir: PathBuf::from(expanded),
        })
    }

    /// Create the upload root and both kind directories.
    pub async fn ensure_dirs(&self) -> Result<()> {
        for kind in [FileKind::Video, FileKind::Material] {
            let dir = self.dir(kind);
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn dir(&self, kind: FileKind) -> PathBuf {
        self.base_dir.join(kind.dir_name())
    }

    /// Open a new stored file for `original_filename`; bytes are appended
    /// with [`PendingUpload::write`] as they arrive.
    pub async fn begin(&self, kind: FileKind, original_filename: &str) -> Result<PendingUpload> {
        let started = Utc::now();
        let stored_name = stored_name_for(original_filename, started.timestamp_millis());
        let path = self.dir(kind).join(&stored_name);
        let file = fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(PendingUpload {
            kind,
            original_name: original_filename.to_string(),
            stored_name,
            path,
            file,
            size: 0,
            started,
        })
    }

    /// Write a complete upload held in memory.
    pub async fn store(
        &self,
        kind: FileKind,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredFile> {
        let mut upload = self.begin(kind, original_filename).await?;
        if let Err(e) = upload.write(data).await {
            upload.discard().await;
            return Err(e);
        }
        upload.finish().await
    }

    /// Resolve a client-supplied name to an existing stored file.
    /// Names that could escape the directory resolve to nothing.
    pub async fn resolve(&self, kind: FileKind, name: &str) -> Option<PathBuf> {
        if !is_plain_name(name) {
            return None;
        }
        let path = self.dir(kind).join(name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Stored file names of one kind, sorted (oldest upload first).
    pub async fn file_names(&self, kind: FileKind) -> Result<Vec<String>> {
        let dir = self.dir(kind);
        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read {}", dir.display()))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn list(&self, kind: FileKind) -> Result<Vec<FileEntry>> {
        let names = self.file_names(kind).await?;
        Ok(names
            .into_iter()
            .map(|filename| FileEntry {
                kind,
                url: kind.url_for(&filename),
                upload_date: upload_date_from_name(&filename),
                filename,
            })
            .collect())
    }
}

/// A stored file still being written.
#[derive(Debug)]
pub struct PendingUpload {
    kind: FileKind,
    original_name: String,
    stored_name: String,
    path: PathBuf,
    file: fs::File,
    size: u64,
    started: DateTime<Utc>,
}

impl PendingUpload {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .write_all(chunk)
            .await
            .context("Failed to write file")?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StoredFile> {
        self.file.flush().await.context("Failed to write file")?;
        Ok(StoredFile {
            id: Uuid::new_v4().to_string(),
            url: self.kind.url_for(&self.stored_name),
            filename: self.stored_name,
            original_name: self.original_name,
            path: self.path.to_string_lossy().into_owned(),
            size: self.size,
            upload_date: self.started.to_rfc3339(),
            content: None,
        })
    }

    /// Drop a partial upload and remove it from disk.
    pub async fn discard(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.path).await {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to remove partial upload");
        }
    }
}

/// `<millis>-<uuid><ext>`; the extension keeps the original's casing.
pub fn stored_name_for(original_filename: &str, epoch_millis: i64) -> String {
    let ext = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{}-{}{}", epoch_millis, Uuid::new_v4(), ext)
}

/// Recover the upload timestamp from a stored name's numeric prefix.
pub fn upload_date_from_name(name: &str) -> Option<String> {
    let prefix = name.split('-').next()?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let millis: i64 = prefix.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|d| d.to_rfc3339())
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}
