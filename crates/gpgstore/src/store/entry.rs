//! Entry writing with atomic replacement, and entry name rules.
//!
//! Plaintext written to an [`EntryWriter`] is encrypted into a sibling
//! temporary file. [`EntryWriter::close`] finalizes the OpenPGP message,
//! syncs it, and renames it over the target, so readers only ever see the
//! previous entry or the complete new one.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::TempPath;

use crate::crypto::{encrypt_to, EncryptingWriter, KeyringEntity};
use crate::error::{Result, StoreError};

/// Prefix of in-flight temporary files inside a store directory.
const TEMP_PREFIX: &str = ".gpgstore-";
const TEMP_SUFFIX: &str = ".tmp";

/// Scoped plaintext sink for one entry.
///
/// Must be released with [`EntryWriter::close`]. A writer dropped without
/// closing discards everything written and leaves any existing entry as it
/// was.
pub struct EntryWriter<'a> {
    plaintext: Option<EncryptingWriter<'a>>,
    file: File,
    temp: Option<TempPath>,
    target: PathBuf,
}

impl<'a> EntryWriter<'a> {
    /// Start a new encrypted entry at `target` for `recipients`.
    pub(crate) fn create(target: PathBuf, recipients: &'a [KeyringEntity]) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(parent_dir(&target))?;
        let file = temp.as_file().try_clone()?;
        let sink = temp.as_file().try_clone()?;
        let temp = temp.into_temp_path();

        let plaintext = encrypt_to(sink, recipients)?;

        Ok(Self {
            plaintext: Some(plaintext),
            file,
            temp: Some(temp),
            target,
        })
    }

    /// Path the entry is committed to on close.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Finalize the encrypted message and atomically replace the entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encryption` if the message cannot be finalized,
    /// or `StoreError::Io` if syncing or renaming fails. On error the
    /// previous entry, if any, is left untouched.
    pub fn close(mut self) -> Result<()> {
        if let Some(plaintext) = self.plaintext.take() {
            plaintext.finish()?;
        }
        self.file.sync_all()?;

        if let Some(temp) = self.temp.take() {
            temp.persist(&self.target).map_err(|e| StoreError::Io(e.error))?;
        }
        sync_parent(&self.target)?;

        info!("wrote entry {}", self.target.display());
        Ok(())
    }
}

impl Write for EntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.plaintext.as_mut() {
            Some(plaintext) => plaintext.write(buf),
            None => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.plaintext.as_mut() {
            Some(plaintext) => plaintext.flush(),
            None => Err(closed()),
        }
    }
}

impl Drop for EntryWriter<'_> {
    fn drop(&mut self) {
        if self.plaintext.is_some() {
            warn!(
                "entry {} dropped without close, discarding partial write",
                self.target.display()
            );
        }
        // The temporary file is removed when `temp` drops.
    }
}

/// Flush the directory entry of a freshly renamed file to disk.
#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    File::open(parent_dir(path))?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "entry writer is closed")
}

/// Check that `name` addresses a file directly under a store root.
///
/// # Errors
///
/// Returns `StoreError::InvalidEntryName` for empty names, `.` and `..`,
/// and names containing a path separator or NUL.
pub fn validate_entry_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains(std::path::MAIN_SEPARATOR)
        || name.contains('\0');

    if invalid {
        return Err(StoreError::InvalidEntryName(name.to_string()));
    }
    Ok(())
}
