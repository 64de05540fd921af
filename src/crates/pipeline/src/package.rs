//! Deployment archive packaging
//!
//! Produces `<out>/<name>-<version>.zip` holding the step binary as
//! `bootstrap` plus a `manifest.json`, and optionally uploads it to the blob
//! store under `deploy/<version>/`.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::storage::{BlobStore, BlobUri, StorageError};

pub const BOOTSTRAP_NAME: &str = "bootstrap";
pub const MANIFEST_NAME: &str = "manifest.json";
const ZIP_CONTENT_TYPE: &str = "application/zip";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Binary not found: {0}")]
    MissingBinary(PathBuf),

    #[error("Invalid package setting: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Upload failed: {0}")]
    Storage(#[from] StorageError),
}

/// Describes the archive contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub handler: String,
    pub workflow: String,
    pub steps: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub name: String,
    pub version: String,
    pub workflow: String,
    pub binary: PathBuf,
    pub out_dir: PathBuf,
}

impl PackageOptions {
    pub fn archive_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}-{}.zip", self.name, self.version))
    }
}

fn check_name(value: &str, what: &str) -> Result<(), PackageError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !value.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(PackageError::Invalid(format!("{} '{}' is not file-name safe", what, value)))
    }
}

/// Build the archive and return its path
pub fn build_package(options: &PackageOptions) -> Result<PathBuf, PackageError> {
    check_name(&options.name, "name")?;
    check_name(&options.version, "version")?;
    if !options.binary.is_file() {
        return Err(PackageError::MissingBinary(options.binary.clone()));
    }

    let mut binary = Vec::new();
    File::open(&options.binary)?.read_to_end(&mut binary)?;

    let manifest = PackageManifest {
        name: options.name.clone(),
        version: options.version.clone(),
        handler: BOOTSTRAP_NAME.to_string(),
        workflow: options.workflow.clone(),
        steps: crate::steps::StepKind::ALL
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    std::fs::create_dir_all(&options.out_dir)?;
    let path = options.archive_path();
    let mut zip = ZipWriter::new(File::create(&path)?);

    let executable = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file(BOOTSTRAP_NAME, executable)?;
    zip.write_all(&binary)?;

    let plain = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    zip.start_file(MANIFEST_NAME, plain)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    zip.finish()?;
    info!(path = %path.display(), bytes = binary.len(), "Package written");
    Ok(path)
}

/// Upload an archive under `deploy/<version>/<file name>`
pub async fn upload_artifact(
    store: &dyn BlobStore,
    archive: &Path,
    version: &str,
) -> Result<BlobUri, PackageError> {
    check_name(version, "version")?;
    let file_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PackageError::Invalid(format!("bad archive path {}", archive.display())))?;
    let bytes = tokio::fs::read(archive).await?;
    let uri = store
        .put(&format!("deploy/{}/{}", version, file_name), bytes, ZIP_CONTENT_TYPE)
        .await?;
    info!(uri = %uri, "Package uploaded");
    Ok(uri)
}
