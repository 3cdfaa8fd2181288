//! Recipient identities — marker files and key binding.
//!
//! A store directory names its recipients in a `.gpg-id` marker file.
//! The identities listed there select which keyring entities the store
//! encrypts to and decrypts with.

pub mod binding;
pub mod marker;

pub use binding::bind_keys;
pub use marker::{has_marker, resolve_identities, write_marker, MARKER_FILE};
