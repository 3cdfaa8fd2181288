//! `.gpg-id` marker files.
//!
//! File format: UTF-8 text, one identity per line, in insertion order.
//! Duplicates and blank lines are kept as written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use crate::error::Result;

/// Name of the marker file inside a store directory.
pub const MARKER_FILE: &str = ".gpg-id";

/// Read the identities listed in `store_path/.gpg-id`.
///
/// A missing or unreadable marker yields an empty list; callers that need
/// recipients detect the empty key set later.
pub fn resolve_identities(store_path: &Path) -> Vec<String> {
    let path = store_path.join(MARKER_FILE);

    match std::fs::read_to_string(&path) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no marker file at {}", path.display());
            Vec::new()
        }
        Err(e) => {
            warn!("ignoring unreadable marker file {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Write `store_path/.gpg-id` with one identity per line.
///
/// # Errors
///
/// Returns `StoreError::Io` if the file cannot be created or written.
pub fn write_marker<I>(store_path: &Path, identities: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let file = File::create(store_path.join(MARKER_FILE))?;
    let mut out = BufWriter::new(file);
    for identity in identities {
        writeln!(out, "{}", identity.as_ref())?;
    }
    out.flush()?;
    Ok(())
}

/// Whether `dir` contains a marker file (existence only).
pub fn has_marker(dir: &Path) -> bool {
    std::fs::metadata(dir.join(MARKER_FILE)).is_ok()
}
