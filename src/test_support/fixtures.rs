//! Test fixtures: install trees, containers and source tarballs on disk.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::core::container::image_path;
use crate::core::RuntimeInstall;
use crate::util::process::find_executable;

/// Create an install directory with empty `bin` and `lib` under `base`.
pub fn fake_install(base: &Path, descriptor: &str) -> RuntimeInstall {
    let install = RuntimeInstall::new(base, &descriptor.parse().expect("valid descriptor"));
    fs::create_dir_all(&install.bin_dir).unwrap();
    fs::create_dir_all(&install.lib_dir).unwrap();
    install
}

/// Create a container directory with a placeholder image.
pub fn fake_container(base: &Path, name: &str) -> PathBuf {
    let image = image_path(base, name);
    fs::create_dir_all(image.parent().unwrap()).unwrap();
    fs::write(&image, b"SIF").unwrap();
    image
}

/// Make the install's `mpirun` echo its arguments.
///
/// A symlink to the system `echo` avoids executing a file that was just
/// written, which can fail with ETXTBSY while other tests fork.
pub fn link_echo_launcher(install: &RuntimeInstall) -> PathBuf {
    let echo = find_executable("echo").expect("echo on PATH");
    let launcher = install.bin(crate::core::job::LAUNCHER);
    std::os::unix::fs::symlink(echo, &launcher).unwrap();
    launcher
}

/// Gzip-compressed tarball with every file under the directory `root`.
pub fn source_tarball(root: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", root, path), contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
