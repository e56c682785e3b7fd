//! Remote storage access by shelling out to rclone.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::ports::Transport;
use crate::utils::errors::{Result, RotatorError};

pub struct RcloneTransport;

#[async_trait]
impl Transport for RcloneTransport {
    async fn check_available(&self) -> Result<()> {
        let status = Command::new("rclone")
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| RotatorError::ToolMissing(format!("rclone: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(RotatorError::ToolMissing(format!(
                "rclone version exited with {status}"
            )))
        }
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let output = Command::new("rclone")
            .arg("copy")
            .arg(local)
            .arg(remote)
            .output()
            .await
            .map_err(|e| RotatorError::Upload(format!("failed to run rclone: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotatorError::Upload(format!(
                "rclone copy exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn list(&self, remote: &str) -> Result<Vec<String>> {
        let output = Command::new("rclone")
            .arg("lsf")
            .arg(remote)
            .output()
            .await
            .map_err(|e| RotatorError::Listing(format!("failed to run rclone: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotatorError::Listing(format!(
                "rclone lsf exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim_end_matches('/').to_string())
            .filter(|line| !line.is_empty())
            .collect();

        Ok(names)
    }

    async fn delete(&self, remote: &str, entry: &str) -> Result<()> {
        let target = format!("{remote}/{entry}");
        let output = Command::new("rclone")
            .arg("deletefile")
            .arg(&target)
            .output()
            .await
            .map_err(|e| RotatorError::Deletion(format!("failed to run rclone: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotatorError::Deletion(format!(
                "rclone deletefile exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
