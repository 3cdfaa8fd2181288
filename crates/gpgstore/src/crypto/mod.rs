//! OpenPGP gateway for gpgstore.
//!
//! This module provides:
//! - Keyring parsing into [`KeyringEntity`] values
//! - Explicit passphrase unlocking of secret keys
//! - Streaming encryption to a set of recipients
//! - Streaming decryption with a set of candidate keys
//!
//! All cryptography is delegated to `sequoia-openpgp`; the store never
//! touches key material directly.

pub mod decrypt;
pub mod encrypt;
pub mod keyring;

use sequoia_openpgp::policy::StandardPolicy;

pub use decrypt::{decrypt_message, DecryptingReader};
pub use encrypt::{encrypt_to, EncryptingWriter};
pub use keyring::{parse_keyring, KeyringEntity, LockState};

/// Policy used for every key selection and message check.
pub(crate) const POLICY: &StandardPolicy = &StandardPolicy::new();
