//! Zip packaging of release binaries.
//!
//! Each target gets `dist/<app>-<alias>.zip` holding exactly one entry: the
//! binary, named `<app>.exe` on Windows and `<app>` elsewhere. Re-running for
//! the same target truncates and rewrites the same archive.

use crate::build::BuildArtifact;
use crate::error::PackageError;
use crate::target::TargetSpec;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A per-target archive on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArchive {
    /// Path of the zip file
    pub archive_path: PathBuf,
    /// Name of the single entry inside the archive
    pub entry_name: String,
    /// Target the archive was built for
    pub target: TargetSpec,
}

/// Writes release archives into the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactPackager {
    dist_dir: PathBuf,
    app_name: String,
}

impl ArtifactPackager {
    /// Create a packager writing `<app_name>-<alias>.zip` files into `dist_dir`.
    pub fn new(dist_dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            dist_dir: dist_dir.into(),
            app_name: app_name.into(),
        }
    }

    /// Create the output directory if it does not exist. Never removes anything.
    pub async fn ensure_dist_dir(&self) -> Result<(), PackageError> {
        tokio::fs::create_dir_all(&self.dist_dir)
            .await
            .map_err(|source| PackageError::OutputDir {
                path: self.dist_dir.clone(),
                source,
            })
    }

    /// `<dist>/<app>-<alias>.zip`
    pub fn archive_path(&self, target: &TargetSpec) -> PathBuf {
        self.dist_dir
            .join(format!("{}-{}.zip", self.app_name, target.alias))
    }

    /// Archive the binary of `artifact`, consuming it.
    pub async fn package(&self, artifact: BuildArtifact) -> Result<PackageArchive, PackageError> {
        let target = artifact.target;
        let archive_path = self.archive_path(&target);
        let entry_name = target.os_family.binary_name(&self.app_name);

        if !artifact.binary_path.is_file() {
            return Err(PackageError::BinaryMissing {
                path: artifact.binary_path,
            });
        }

        log::info!(
            "Packaging {} as {} in {}",
            artifact.binary_path.display(),
            entry_name,
            archive_path.display()
        );

        // Zip encoding is blocking IO and CPU work.
        let source = artifact.binary_path;
        let dest = archive_path.clone();
        let name = entry_name.clone();
        tokio::task::spawn_blocking(move || write_single_entry_zip(&source, &dest, &name))
            .await
            .map_err(|e| PackageError::Task {
                reason: e.to_string(),
            })??;

        Ok(PackageArchive {
            archive_path,
            entry_name,
            target,
        })
    }
}

fn write_single_entry_zip(source: &Path, dest: &Path, entry_name: &str) -> Result<(), PackageError> {
    let io_err = |source: std::io::Error| PackageError::Io {
        path: dest.to_path_buf(),
        source,
    };
    let zip_err = |source: zip::result::ZipError| PackageError::Zip {
        path: dest.to_path_buf(),
        source,
    };

    let mut input = BufReader::new(File::open(source).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PackageError::BinaryMissing {
                path: source.to_path_buf(),
            }
        } else {
            io_err(e)
        }
    })?);

    let output = File::create(dest).map_err(io_err)?;
    let mut writer = ZipWriter::new(BufWriter::new(output));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);

    writer.start_file(entry_name, options).map_err(zip_err)?;
    std::io::copy(&mut input, &mut writer).map_err(io_err)?;
    let mut buffered = writer.finish().map_err(zip_err)?;
    std::io::Write::flush(&mut buffered).map_err(io_err)?;
    Ok(())
}
