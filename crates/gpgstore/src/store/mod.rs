//! The password store: a directory of encrypted entries bound to a key set.
//!
//! # Directory layout
//!
//! ```text
//! store/
//! ├── .gpg-id          recipient identities, one per line
//! ├── {name}.gpg       encrypted entries
//! └── {sub}/           substore with its own recipients
//!     ├── .gpg-id
//!     └── {name}.gpg
//! ```
//!
//! A [`Store`] holds its root path and the keyring entities bound to it.
//! It never mutates its key set after construction; reading an entry
//! unlocks copies of the bound keys.

pub mod entry;

use std::fs::{File, ReadDir};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info};
use sequoia_openpgp::crypto::Password;

use crate::crypto::{decrypt_message, parse_keyring, DecryptingReader, KeyringEntity};
use crate::error::{Result, StoreError};
use crate::identity::{bind_keys, has_marker, resolve_identities, write_marker};

pub use entry::{validate_entry_name, EntryWriter};

/// File extension of encrypted entries.
pub const ENTRY_EXTENSION: &str = ".gpg";

/// A directory-backed password store.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    keys: Vec<KeyringEntity>,
}

impl Store {
    /// Open an existing store or substore, binding the keyring entities
    /// named by its `.gpg-id` marker.
    ///
    /// `path` is not checked; a missing directory surfaces as a filesystem
    /// error from the first operation that touches it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::KeyringParse` if `keyring` is not a valid
    /// keyring, or `StoreError::Io` if it cannot be read.
    pub fn open(path: impl Into<PathBuf>, mut keyring: impl Read) -> Result<Self> {
        let mut bytes = Vec::new();
        keyring.read_to_end(&mut bytes)?;
        let entities = parse_keyring(&bytes)?;
        Ok(Self::from_keyring(path, &entities))
    }

    /// Open a store against an already parsed keyring.
    pub fn from_keyring(path: impl Into<PathBuf>, keyring: &[KeyringEntity]) -> Self {
        let root = path.into();
        let identities = resolve_identities(&root);
        let keys = bind_keys(keyring, &identities);
        debug!(
            "opened store {} with {} of {} keyring key(s) bound",
            root.display(),
            keys.len(),
            keyring.len()
        );
        Self { root, keys }
    }

    /// Create a new store directory owned by the current user (mode 0700)
    /// and record the identities of `keys` in its marker.
    ///
    /// Not atomic: if writing the marker fails the directory stays behind.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryExists` if `path` already exists,
    /// `StoreError::PermissionDenied` if it cannot be created, or
    /// `StoreError::Io` for other filesystem errors.
    pub fn create(path: impl Into<PathBuf>, keys: Vec<KeyringEntity>) -> Result<Self> {
        let root = path.into();
        create_private_dir(&root)?;
        write_marker(&root, keys.iter().flat_map(|entity| entity.identities()))?;
        info!(
            "created store {} for {} recipient(s)",
            root.display(),
            keys.len()
        );
        Ok(Self { root, keys })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keyring entities bound to the store, in keyring order.
    pub fn keys(&self) -> &[KeyringEntity] {
        &self.keys
    }

    /// Identities currently listed in the store's marker file.
    pub fn identities(&self) -> Vec<String> {
        resolve_identities(&self.root)
    }

    /// Names of the `.gpg` entries directly under the root, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryRead` if the root cannot be listed.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in self.read_root()? {
            let entry = entry.map_err(|e| self.directory_error(e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                debug!("skipping non UTF-8 name in {}", self.root.display());
                continue;
            };
            if !name.ends_with(ENTRY_EXTENSION) {
                continue;
            }
            if entry.path().is_dir() {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    /// Names of the immediate subdirectories that carry their own marker.
    ///
    /// Only one level is inspected. The result is sorted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryRead` if the root cannot be listed.
    pub fn sub_stores(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in self.read_root()? {
            let entry = entry.map_err(|e| self.directory_error(e))?;
            let path = entry.path();
            if !path.is_dir() || !has_marker(&path) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!("skipping non UTF-8 substore {name:?}"),
            }
        }

        names.sort();
        Ok(names)
    }

    /// Open the substore `name` of this store against `keyring`.
    ///
    /// The substore binds its own recipients from its own marker.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidEntryName` if `name` is not a plain
    /// directory name.
    pub fn open_sub_store(&self, name: &str, keyring: &[KeyringEntity]) -> Result<Store> {
        validate_entry_name(name)?;
        Ok(Self::from_keyring(self.root.join(name), keyring))
    }

    /// Start writing the entry `filename`, encrypted to every bound key.
    ///
    /// The returned writer must be closed for the entry to be committed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encryption` if the store has no usable
    /// recipient, `StoreError::InvalidEntryName` for names that escape the
    /// root, or `StoreError::Io` if the entry file cannot be created.
    pub fn write(&self, filename: &str) -> Result<EntryWriter<'_>> {
        validate_entry_name(filename)?;
        if self.keys.is_empty() {
            return Err(StoreError::Encryption(format!(
                "store {} has no recipient keys",
                self.root.display()
            )));
        }
        EntryWriter::create(self.root.join(filename), &self.keys)
    }

    /// Open the entry `filename` and decrypt it with the bound keys,
    /// unlocked with `passphrase`.
    ///
    /// Every bound key is offered the passphrase, whichever key the entry
    /// was encrypted to. The returned reader yields the plaintext once and
    /// owns the entry's file handle.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the entry cannot be opened,
    /// `StoreError::Decryption` if no bound key can decrypt it (wrong
    /// passphrase, foreign recipient, empty key set), or
    /// `StoreError::CorruptMessage` if the ciphertext is malformed.
    pub fn read(&self, filename: &str, passphrase: &[u8]) -> Result<DecryptingReader> {
        validate_entry_name(filename)?;
        let file = File::open(self.root.join(filename))?;

        if self.keys.is_empty() {
            return Err(StoreError::Decryption(format!(
                "store {} has no recipient keys",
                self.root.display()
            )));
        }

        let password = Password::from(passphrase.to_vec());
        let mut candidates = self.keys.clone();
        for entity in candidates.iter_mut() {
            if let Err(e) = entity.unlock(&password) {
                debug!("key {} not unlocked: {e}", entity.fingerprint());
            }
        }

        decrypt_message(file, &candidates)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn read_root(&self) -> Result<ReadDir> {
        std::fs::read_dir(&self.root).map_err(|e| self.directory_error(e))
    }

    fn directory_error(&self, source: io::Error) -> StoreError {
        StoreError::DirectoryRead {
            path: self.root.clone(),
            source,
        }
    }
}

/// Create `path` as a new directory accessible by its owner only.
fn create_private_dir(path: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder.create(path).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => StoreError::DirectoryExists(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(path.to_path_buf()),
        _ => StoreError::Io(e),
    })?;

    // Set explicitly so the process umask cannot change the result.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
