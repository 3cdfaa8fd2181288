//! gpgstore — a minimal encrypted password store.
//!
//! A store is a directory of `.gpg` entries, each an OpenPGP message
//! encrypted to the recipients named in the directory's `.gpg-id` marker.
//! Subdirectories with their own marker are substores with their own
//! recipients.
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use gpgstore::Store;
//!
//! # fn main() -> gpgstore::Result<()> {
//! let keyring = std::fs::File::open("keyring.pgp")?;
//! let store = Store::open("/home/me/.password-store", keyring)?;
//!
//! let mut entry = store.write("email.gpg")?;
//! entry.write_all(b"hunter2\n")?;
//! entry.close()?;
//!
//! let mut plaintext = String::new();
//! store.read("email.gpg", b"passphrase")?.read_to_string(&mut plaintext)?;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod identity;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export primary types
pub use crypto::{parse_keyring, DecryptingReader, KeyringEntity, LockState};
pub use error::{Result, StoreError};
pub use identity::{bind_keys, resolve_identities, MARKER_FILE};
pub use store::{EntryWriter, Store};
