//! Keyring entities and explicit secret key unlocking.
//!
//! A [`KeyringEntity`] is one certificate from a keyring together with the
//! secret key material it carried. Unlocking is a visible state transition
//! on the entity value (see [`LockState`]) instead of hidden mutation inside
//! the OpenPGP library.

use std::fmt;

use log::debug;
use sequoia_openpgp as openpgp;
use sequoia_openpgp::cert::prelude::*;
use sequoia_openpgp::crypto::Password;
use sequoia_openpgp::packet::key::{SecretParts, UnspecifiedRole};
use sequoia_openpgp::packet::Key;
use sequoia_openpgp::parse::Parse;

use crate::error::{Result, StoreError};

/// A primary key or subkey with secret material, possibly still encrypted.
pub(crate) type SecretKey = Key<SecretParts, UnspecifiedRole>;

/// Availability of an entity's secret key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// The entity carries no secret keys at all.
    PublicOnly,
    /// At least one secret key is still protected by a passphrase.
    Locked,
    /// Every secret key is usable.
    Unlocked,
}

/// One certificate of a keyring.
#[derive(Clone)]
pub struct KeyringEntity {
    cert: Cert,
    secrets: Vec<SecretKey>,
}

impl KeyringEntity {
    /// Wrap a parsed certificate, collecting its secret keys.
    pub fn new(cert: Cert) -> Self {
        let secrets = cert.keys().secret().map(|ka| ka.key().clone()).collect();
        Self { cert, secrets }
    }

    /// The underlying certificate.
    pub fn cert(&self) -> &Cert {
        &self.cert
    }

    /// Uppercase hex fingerprint of the primary key.
    pub fn fingerprint(&self) -> String {
        self.cert.fingerprint().to_hex()
    }

    /// User ID strings carried by this entity, in canonical certificate
    /// order (not necessarily the order they were added in).
    pub fn identities(&self) -> Vec<String> {
        self.cert
            .userids()
            .map(|ua| String::from_utf8_lossy(ua.userid().value()).into_owned())
            .collect()
    }

    /// Current availability of the secret key material.
    pub fn lock_state(&self) -> LockState {
        if self.secrets.is_empty() {
            LockState::PublicOnly
        } else if self.secrets.iter().all(|key| !key.secret().is_encrypted()) {
            LockState::Unlocked
        } else {
            LockState::Locked
        }
    }

    /// Try to unlock every still-locked secret key with `passphrase`.
    ///
    /// Keys that accept the passphrase become usable; the others stay
    /// locked. Unlocking an already unlocked entity succeeds without doing
    /// any work.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decryption` if the entity has no secret keys, or
    /// if no locked key accepted the passphrase. The entity is unchanged in
    /// both cases.
    pub fn unlock(&mut self, passphrase: &Password) -> Result<LockState> {
        match self.lock_state() {
            LockState::Unlocked => return Ok(LockState::Unlocked),
            LockState::PublicOnly => {
                return Err(StoreError::Decryption(format!(
                    "key {} has no secret key material",
                    self.fingerprint()
                )))
            }
            LockState::Locked => {}
        }

        let mut unlocked = 0usize;
        for key in self.secrets.iter_mut() {
            if !key.secret().is_encrypted() {
                continue;
            }
            match key.clone().decrypt_secret(passphrase) {
                Ok(decrypted) => {
                    *key = decrypted;
                    unlocked += 1;
                }
                Err(e) => debug!("secret key {} stays locked: {e}", key.fingerprint()),
            }
        }

        if unlocked == 0 {
            return Err(StoreError::Decryption(format!(
                "passphrase does not unlock key {}",
                self.fingerprint()
            )));
        }
        Ok(self.lock_state())
    }

    /// Fold another copy of the same certificate into this one.
    ///
    /// Secret key material from either copy is kept, so a public-only
    /// entry followed by its secret export binds as a single keyed entity.
    /// The merged entity starts from the certificates' own lock state.
    pub(crate) fn merge(&mut self, other: &KeyringEntity) {
        match self
            .cert
            .clone()
            .merge_public_and_secret(other.cert.clone())
        {
            Ok(merged) => *self = Self::new(merged),
            Err(e) => debug!("cannot merge copies of {}: {e}", self.fingerprint()),
        }
    }

    /// Secret keys whose material is currently usable.
    pub(crate) fn usable_secret_keys(&self) -> impl Iterator<Item = &SecretKey> {
        self.secrets
            .iter()
            .filter(|key| !key.secret().is_encrypted())
    }
}

impl From<Cert> for KeyringEntity {
    fn from(cert: Cert) -> Self {
        Self::new(cert)
    }
}

impl fmt::Debug for KeyringEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyringEntity")
            .field("fingerprint", &self.fingerprint())
            .field("identities", &self.identities())
            .field("state", &self.lock_state())
            .finish()
    }
}

/// Parse a keyring: a sequence of certificates, binary or ASCII-armored.
///
/// Empty input is an empty keyring. Certificates that cannot be read are
/// skipped as long as at least one other certificate parses.
///
/// # Errors
///
/// Returns `StoreError::KeyringParse` if the data is non-empty but yields
/// no certificate.
pub fn parse_keyring(bytes: &[u8]) -> Result<Vec<KeyringEntity>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        debug!("empty keyring");
        return Ok(Vec::new());
    }

    let parser =
        CertParser::from_bytes(bytes).map_err(|e| StoreError::KeyringParse(e.to_string()))?;

    let mut certs = Vec::new();
    let mut last_error = None;
    for result in parser {
        match result {
            Ok(cert) => certs.push(cert),
            Err(e) => {
                debug!("skipping unreadable certificate: {e}");
                last_error = Some(e);
            }
        }
    }

    if certs.is_empty() {
        return Err(StoreError::KeyringParse(match last_error {
            Some(e) => e.to_string(),
            None => "no certificates found".to_string(),
        }));
    }

    debug!("parsed keyring with {} certificate(s)", certs.len());
    Ok(certs.into_iter().map(KeyringEntity::new).collect())
}
