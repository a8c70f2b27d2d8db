//! Scoped registry files
//!
//! Single-repository ingestion hands its first step a registry document that
//! names exactly one repository. The file lives as long as its guard: it is
//! removed when the guard drops, whichever way the run ends.

use openrisk_core::domain::registry::{RegistryDefaults, RepoName};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repository::registry::render_scoped;

/// Owns a temporary registry document on disk
#[derive(Debug)]
pub struct ScopedRegistryFile {
    path: PathBuf,
}

impl ScopedRegistryFile {
    /// Writes the scoped document for `name` into `dir`
    ///
    /// The file name carries a random suffix so concurrent runs never share
    /// a file.
    pub async fn create(
        dir: &Path,
        defaults: &RegistryDefaults,
        name: &RepoName,
    ) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let file_name = format!(
            "sources_{}_{}_{}.yaml",
            sanitize(&name.org),
            sanitize(&name.repo),
            Uuid::new_v4().simple()
        );
        let path = dir.join(file_name);

        // The guard exists before the write so a failed write still cleans up
        let scoped = Self { path };
        tokio::fs::write(&scoped.path, render_scoped(defaults, name)).await?;

        debug!("Scoped registry written to {}", scoped.path.display());
        Ok(scoped)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedRegistryFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Scoped registry {} removed", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scoped registry {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Replaces every non-word character with `_`
fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
