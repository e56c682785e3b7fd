//! Transport port - external remote storage tool.
//!
//! The remote destination is an opaque string (named remote plus path);
//! its internal structure is the tool's business, not ours.

use std::path::Path;

use async_trait::async_trait;

use crate::utils::errors::Result;

#[async_trait]
pub trait Transport {
    /// Probe the underlying tool before any work starts.
    async fn check_available(&self) -> Result<()>;

    /// Copy a local file into the remote destination, keeping its name.
    async fn upload(&self, local: &Path, remote: &str) -> Result<()>;

    /// List the entry names currently stored at the remote destination.
    async fn list(&self, remote: &str) -> Result<Vec<String>>;

    /// Delete a single entry from the remote destination.
    async fn delete(&self, remote: &str, entry: &str) -> Result<()>;
}
