//! File mutation utilities.

use crate::ui;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Whether a command writes to disk or only reports what it would write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Execute,
    Preview,
}

impl WriteOp {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run { Self::Preview } else { Self::Execute }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, Self::Preview)
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// crash never leaves a truncated file behind.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = std::fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)
}

/// Write a text file, or describe the write in preview mode
pub fn write_file(path: &Path, content: &str, op: WriteOp) -> Result<()> {
    if op.is_preview() {
        ui::dry_run_file_preview(path, content);
        return Ok(());
    }
    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Create a directory tree, or describe it in preview mode
pub fn create_dir_all(path: &Path, op: WriteOp) -> Result<()> {
    if op.is_preview() {
        ui::dry_run_mkdir(path);
        return Ok(());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_replaces_content_and_leaves_no_temp() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("nested/wizard.json");

        atomic_write(&path, b"{\"a\":1}").expect("first write");
        atomic_write(&path, b"{\"a\":2}").expect("second write");

        let content = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(content, "{\"a\":2}");
        assert!(!dir.path().join("nested/wizard.json.tmp").exists());
    }

    #[test]
    fn test_preview_does_not_touch_disk() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        write_file(&path, "x = 1", WriteOp::Preview).expect("preview");
        assert!(!path.exists());
    }
}
