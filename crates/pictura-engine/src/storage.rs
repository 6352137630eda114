use std::fs::{self, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};

const MAX_NAME_CHARS: usize = 80;
const MAX_COLLISION_SUFFIX: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Uploads,
    Filtered,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Uploads, Bucket::Filtered];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Uploads => "uploads",
            Self::Filtered => "filtered",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{} is no longer available; it may have been swept", .path.display())]
    Missing { path: PathBuf },
    #[error("storage io failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode image as png: {0}")]
    Encode(#[from] image::ImageError),
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return Self::Missing {
                path: path.to_path_buf(),
            };
        }
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Handle to a file written by [`TransientStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub bucket: Bucket,
    pub name: String,
    pub path: PathBuf,
}

impl StoredImage {
    pub fn read_bytes(&self) -> Result<Vec<u8>, StorageError> {
        fs::read(&self.path).map_err(|err| StorageError::io(&self.path, err))
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// `bucket/name`, used in event logs.
    pub fn artifact(&self) -> String {
        format!("{}/{}", self.bucket.dir_name(), self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub kept: usize,
    pub failed: usize,
}

/// Two write-once buckets of short-lived files under one root directory.
#[derive(Debug, Clone)]
pub struct TransientStore {
    root: PathBuf,
}

impl TransientStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.dir_name())
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        for bucket in Bucket::ALL {
            let dir = self.bucket_dir(bucket);
            fs::create_dir_all(&dir).map_err(|err| StorageError::io(&dir, err))?;
        }
        Ok(())
    }

    /// Stores raw upload bytes as `{timestamp}_{file name}`.
    pub fn save_upload(&self, file_name: &str, bytes: &[u8]) -> Result<StoredImage, StorageError> {
        let name = format!("{}_{}", timestamp(), sanitize_file_name(file_name));
        self.write_once(Bucket::Uploads, &name, bytes)
    }

    /// Stores a filtered image as `{timestamp}_{sha256(source)[..8]}_{style}.png`.
    pub fn save_filtered(
        &self,
        image: &DynamicImage,
        source_bytes: &[u8],
        style_tag: &str,
    ) -> Result<StoredImage, StorageError> {
        let mut encoded = Cursor::new(Vec::new());
        image.write_to(&mut encoded, ImageFormat::Png)?;
        let name = format!(
            "{}_{}_{}.png",
            timestamp(),
            short_hash(source_bytes),
            style_tag
        );
        self.write_once(Bucket::Filtered, &name, encoded.get_ref())
    }

    pub fn sweep(&self, max_age: Duration) -> SweepReport {
        self.sweep_at(SystemTime::now(), max_age)
    }

    /// Removes files whose modification time is older than `max_age` at `now`.
    /// Missing bucket directories count as empty.
    pub fn sweep_at(&self, now: SystemTime, max_age: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        for bucket in Bucket::ALL {
            let dir = self.bucket_dir(bucket);
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let Ok(metadata) = entry.metadata() else {
                    report.failed += 1;
                    continue;
                };
                if !metadata.is_file() {
                    continue;
                }
                let age = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age <= max_age {
                    report.kept += 1;
                    continue;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::debug!(path = %path.display(), "swept transient file");
                        report.removed += 1;
                    }
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "failed to sweep file");
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }

    fn write_once(
        &self,
        bucket: Bucket,
        name: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, StorageError> {
        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir).map_err(|err| StorageError::io(&dir, err))?;

        let (stem, extension) = split_extension(name);
        for suffix in 0..MAX_COLLISION_SUFFIX {
            let candidate = if suffix == 0 {
                name.to_string()
            } else {
                format!("{stem}-{suffix}{extension}")
            };
            let path = dir.join(&candidate);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(StorageError::io(&path, err)),
            };
            file.write_all(bytes)
                .map_err(|err| StorageError::io(&path, err))?;
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "stored transient file");
            return Ok(StoredImage {
                bucket,
                name: candidate,
                path,
            });
        }
        Err(StorageError::Io {
            path: dir.join(name),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "no free file name"),
        })
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string()
}

/// First four bytes of the SHA-256 digest as hex.
pub fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..4])
}

fn sanitize_file_name(raw: &str) -> String {
    let base = Path::new(raw.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => (&name[..index], &name[index..]),
        _ => (name, ""),
    }
}
