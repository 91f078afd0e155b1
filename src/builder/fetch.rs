//! Locating and downloading release tarballs.
//!
//! Each implementation has a `<etc_dir>/<id>.conf` file mapping versions to
//! download URLs:
//!
//! ```text
//! 4.0.2 = https://download.open-mpi.org/release/open-mpi/v4.0/openmpi-4.0.2.tar.gz
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::core::Implementation;
use crate::util::fs::extract_tarball;
use crate::util::kv::KvStore;
use crate::util::shell::{Shell, Status};

/// Path of the download list of implementation `id`.
pub fn release_list(etc_dir: &Path, id: &str) -> PathBuf {
    etc_dir.join(format!("{}.conf", id))
}

/// Download URL of `implementation`, validated.
pub fn release_url(etc_dir: &Path, implementation: &Implementation) -> Result<Url> {
    let list = release_list(etc_dir, &implementation.id);
    let releases = KvStore::load(&list)
        .with_context(|| format!("no known releases of {}", implementation.id))?;

    let raw = releases.get(&implementation.version).with_context(|| {
        format!(
            "{} is not listed in {}",
            implementation,
            list.display()
        )
    })?;

    let url = Url::parse(raw).with_context(|| format!("invalid URL for {}: {}", implementation, raw))?;
    if !is_supported_archive(&url) {
        bail!(
            "unsupported archive format for {}: {} (expected .tar.gz or .tgz)",
            implementation,
            url
        );
    }
    Ok(url)
}

fn is_supported_archive(url: &Url) -> bool {
    let path = url.path();
    path.ends_with(".tar.gz") || path.ends_with(".tgz")
}

/// Fetch the tarball at `url` and unpack it into `dest`.
///
/// Returns the directory holding the sources: the archive's single top-level
/// directory, or `dest` itself for flat archives.
pub fn fetch_and_extract(url: &Url, dest: &Path, shell: &Arc<Shell>) -> Result<PathBuf> {
    let data = match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| anyhow::anyhow!("invalid file URL: {}", url))?;
            let mut data = Vec::new();
            BufReader::new(
                File::open(&path).with_context(|| format!("failed to open {}", path.display()))?,
            )
            .read_to_end(&mut data)
            .with_context(|| format!("failed to read {}", path.display()))?;
            data
        }
        "http" | "https" => download(url, shell)?,
        other => bail!("unsupported URL scheme '{}': {}", other, url),
    };

    let root = extract_tarball(data.as_slice(), dest)
        .with_context(|| format!("failed to extract tarball from {}", url))?;
    Ok(root.unwrap_or_else(|| dest.to_path_buf()))
}

/// Largest buffer reserved up front from a server-reported length.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Bytes to reserve for a body of `content_length`; the header is not trusted.
fn initial_capacity(content_length: u64) -> usize {
    usize::try_from(content_length.min(MAX_PREALLOC)).unwrap_or(0)
}

fn download(url: &Url, shell: &Arc<Shell>) -> Result<Vec<u8>> {
    shell.status(Status::Downloading, url);

    let mut response = reqwest::blocking::get(url.as_str())
        .with_context(|| format!("failed to download {}", url))?;
    if !response.status().is_success() {
        bail!("failed to download {}: HTTP {}", url, response.status());
    }

    let total = response.content_length().unwrap_or(0);
    let name = url
        .path_segments()
        .and_then(|s| s.last())
        .unwrap_or("download")
        .to_string();
    let mut progress = shell.bytes_progress(name, total);

    let mut data = Vec::with_capacity(initial_capacity(total));
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = response
            .read(&mut buf)
            .with_context(|| format!("failed to read response body from {}", url))?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        progress.inc(n as u64);
    }
    progress.finish();

    tracing::debug!("downloaded {} bytes from {}", data.len(), url);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::source_tarball;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_initial_capacity_is_capped() {
        assert_eq!(initial_capacity(0), 0);
        assert_eq!(initial_capacity(4096), 4096);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_release_url() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("openmpi.conf"),
            "4.0.2 = https://download.open-mpi.org/release/open-mpi/v4.0/openmpi-4.0.2.tar.gz\n\
             3.0.0 = https://example.com/openmpi-3.0.0.tar.bz2\n",
        )
        .unwrap();

        let url = release_url(tmp.path(), &Implementation::new("openmpi", "4.0.2")).unwrap();
        assert_eq!(url.host_str(), Some("download.open-mpi.org"));

        let err = release_url(tmp.path(), &Implementation::new("openmpi", "3.0.0")).unwrap_err();
        assert!(err.to_string().contains("unsupported archive format"));

        assert!(release_url(tmp.path(), &Implementation::new("openmpi", "9.9.9")).is_err());
        assert!(release_url(tmp.path(), &Implementation::new("mpich", "3.3")).is_err());
    }

    #[test]
    fn test_fetch_file_url() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("mpich-3.3.tar.gz");
        fs::write(&archive, source_tarball("mpich-3.3", &[("configure", "#!/bin/sh\n")])).unwrap();

        let url = Url::from_file_path(&archive).unwrap();
        let dest = tmp.path().join("build");
        let shell = Arc::new(Shell::default());

        let root = fetch_and_extract(&url, &dest, &shell).unwrap();
        assert_eq!(root, dest.join("mpich-3.3"));
        assert!(root.join("configure").is_file());
    }

    #[test]
    fn test_unsupported_scheme() {
        let tmp = TempDir::new().unwrap();
        let url = Url::parse("ftp://example.com/openmpi-4.0.2.tar.gz").unwrap();
        let shell = Arc::new(Shell::default());
        assert!(fetch_and_extract(&url, tmp.path(), &shell).is_err());
    }
}
