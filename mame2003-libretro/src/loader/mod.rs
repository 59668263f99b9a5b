//! Loader utilities for the MAME 2003 core.
//!
//! Responsibilities:
//! - Derive the romset (driver) name from the content path the frontend hands us.
//! - Work out the session's storage roots, falling back to the content's folder
//!   when the frontend has no system or save directory configured.
//!
//! Notes:
//! - The romset is never read here; the machine core opens it itself through
//!   the path resolver, so only the path matters.

use crate::storage::{PathError, PathRoots};
use log::{debug, info};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest romset name the machine's driver table can hold.
pub const MAX_ROMSET_NAME: usize = 127;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no content path supplied")]
    NoContent,
    #[error("cannot derive a romset name from {}", .0.display())]
    BadContentName(PathBuf),
    #[error("game {0} not found in the driver list")]
    UnknownRomset(String),
    #[error(transparent)]
    Storage(#[from] PathError),
    #[error("failed to start {romset}: {reason}")]
    Boot { romset: String, reason: anyhow::Error },
}

/// Romset name for `content`: the file name up to its first `.`.
///
/// Both `/` and `\` count as separators so Windows-style paths from the
/// frontend work everywhere.
pub fn romset_name(content: &Path) -> Option<String> {
    let path = content.to_string_lossy();
    let file_name = path.rsplit(['/', '\\']).next()?;
    let stem = file_name.split('.').next()?;
    let name: String = stem.chars().take(MAX_ROMSET_NAME).collect();
    if name.len() < stem.len() {
        debug!("romset name {stem:?} clipped to {MAX_ROMSET_NAME} characters");
    }
    (!name.is_empty()).then_some(name)
}

/// Folder holding `content`; the current directory when it has none.
pub fn content_directory(content: &Path) -> PathBuf {
    match content.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Storage roots for a session playing `content`.
///
/// The rom root is always the content's folder; system and save fall back to it.
pub fn resolve_roots(content: &Path, system: Option<PathBuf>, save: Option<PathBuf>) -> PathRoots {
    let rom = content_directory(content);
    let system = system.unwrap_or_else(|| {
        info!("no system directory, using {}", rom.display());
        rom.clone()
    });
    let save = save.unwrap_or_else(|| {
        info!("no save directory, using {}", rom.display());
        rom.clone()
    });
    PathRoots { system, save, rom }
}
