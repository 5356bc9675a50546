//! Media storage for uploaded files
//!
//! Files live under the configured media root and are served statically
//! from `url_prefix`. Stored paths are relative to the root.

use chrono::{Datelike, Utc};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{TrackerError, TrackerResult};

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Store an upload under `{dir}/{year}/{month}/`, never overwriting
    pub async fn save_upload(
        &self,
        dir: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> TrackerResult<String> {
        let now = Utc::now();
        let folder = format!("{}/{}/{}", dir, now.year(), now.month());
        tokio::fs::create_dir_all(self.root.join(&folder)).await?;

        let clean = sanitize_file_name(file_name);
        let mut relative = format!("{}/{}", folder, clean);
        while tokio::fs::try_exists(self.root.join(&relative)).await? {
            relative = format!("{}/{}", folder, with_suffix(&clean, &random_suffix()));
        }

        tokio::fs::write(self.root.join(&relative), bytes).await?;
        debug!("Stored {} bytes at {}", bytes.len(), relative);
        Ok(relative)
    }

    /// Write a file at a fixed relative path, replacing what was there
    pub async fn save_at(&self, relative: &str, bytes: &[u8]) -> TrackerResult<String> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(relative.to_string())
    }

    /// Remove a stored file; missing files are ignored
    pub async fn delete(&self, relative: &str) -> TrackerResult<()> {
        if relative.is_empty() {
            return Ok(());
        }
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Public URL of a stored path, empty when nothing is stored
    pub fn url(&self, relative: &str) -> String {
        if relative.is_empty() {
            return String::new();
        }
        format!("{}/{}", self.url_prefix, relative.trim_start_matches('/'))
    }

    pub fn url_opt(&self, relative: Option<&str>) -> Option<String> {
        relative.filter(|r| !r.is_empty()).map(|r| self.url(r))
    }

    fn resolve(&self, relative: &str) -> TrackerResult<PathBuf> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(TrackerError::BadRequest(format!(
                "Invalid media path: {}",
                relative
            )));
        }
        Ok(self.root.join(path))
    }
}

/// Path of an employee's profile picture
pub fn employee_photo_path(employee_id: &str) -> String {
    format!("employee/{0}/{0}_photo.jpg", employee_id)
}

/// Keep the base name of an upload, restricted to a safe character set
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let clean: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = clean.trim_start_matches('.');
    if clean.is_empty() {
        "upload".to_string()
    } else {
        clean.to_string()
    }
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}

fn random_suffix() -> String {
    clickup_core::generate_id()[..7].to_string()
}
