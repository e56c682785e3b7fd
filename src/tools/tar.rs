//! Archive creation by shelling out to tar.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::ports::Archiver;
use crate::utils::errors::{Result, RotatorError};

pub struct TarArchiver;

#[async_trait]
impl Archiver for TarArchiver {
    async fn check_available(&self) -> Result<()> {
        let status = Command::new("tar")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| RotatorError::ToolMissing(format!("tar: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(RotatorError::ToolMissing(format!(
                "tar --version exited with {status}"
            )))
        }
    }

    async fn create_archive(
        &self,
        source: &Path,
        destination: &Path,
        compression_level: u32,
    ) -> Result<()> {
        let base = source.file_name().ok_or_else(|| {
            RotatorError::Archive(format!("source has no base name: {}", source.display()))
        })?;
        // Archive entries are rooted at the base name, not the full path
        let parent = source.parent().unwrap_or_else(|| Path::new("/"));

        let output = Command::new("tar")
            .arg("--owner=0")
            .arg("--group=0")
            .arg("--numeric-owner")
            .arg("-I")
            .arg(format!("gzip -{compression_level}"))
            .arg("-C")
            .arg(parent)
            .arg("-cf")
            .arg(destination)
            .arg(base)
            .output()
            .await
            .map_err(|e| RotatorError::Archive(format!("failed to run tar: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotatorError::Archive(format!(
                "tar exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
