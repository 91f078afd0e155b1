//! Filesystem utilities.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Unpack a gzip-compressed tarball into `dest`.
///
/// Entries with absolute paths or `..` components are rejected. Returns the
/// top-level directory of the archive when all entries share one, which is
/// where source releases keep their build files.
pub fn extract_tarball(reader: impl Read, dest: &Path) -> Result<Option<PathBuf>> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    ensure_dir(dest)?;

    let mut top_level: Option<PathBuf> = None;
    let mut single_root = true;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        if entry_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!(
                "tarball entry escapes destination directory: {}",
                entry_path.display()
            );
        }

        let root = entry_path.components().find_map(|c| match c {
            Component::Normal(name) => Some(PathBuf::from(name)),
            _ => None,
        });
        match (&top_level, root) {
            (None, Some(root)) => top_level = Some(root),
            (Some(current), Some(root)) if *current != root => single_root = false,
            _ => {}
        }

        entry
            .unpack_in(dest)
            .with_context(|| format!("failed to unpack {}", entry_path.display()))?;
    }

    Ok(top_level
        .filter(|_| single_root)
        .map(|root| dest.join(root))
        .filter(|dir| dir.is_dir()))
}
