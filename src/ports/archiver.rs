//! Archiver port - external archive creation tool.

use std::path::Path;

use async_trait::async_trait;

use crate::utils::errors::Result;

#[async_trait]
pub trait Archiver {
    /// Probe the underlying tool before any work starts.
    async fn check_available(&self) -> Result<()>;

    /// Produce a single compressed archive of `source` at `destination`.
    ///
    /// The archive contains the directory rooted at its own base name with
    /// uid/gid zeroed, so it restores the same on any machine.
    async fn create_archive(
        &self,
        source: &Path,
        destination: &Path,
        compression_level: u32,
    ) -> Result<()>;
}
