//! Streaming OpenPGP decryption with a set of candidate keys.
//!
//! Signatures inside the message are not verified; only confidentiality
//! and integrity (MDC/AEAD) are checked.

use std::io::{self, Read};

use log::debug;
use sequoia_openpgp as openpgp;
use sequoia_openpgp::crypto::SessionKey;
use sequoia_openpgp::packet::{PKESK, SKESK};
use sequoia_openpgp::parse::stream::{
    DecryptionHelper, Decryptor, DecryptorBuilder, MessageStructure, VerificationHelper,
};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::types::SymmetricAlgorithm;
use sequoia_openpgp::{Cert, Fingerprint, KeyHandle};

use super::keyring::{KeyringEntity, SecretKey};
use super::POLICY;
use crate::error::{Result, StoreError};

/// Finite, single-pass source of decrypted plaintext.
///
/// Owns the ciphertext source (typically the entry's file handle) and
/// releases it when dropped.
pub struct DecryptingReader {
    inner: Decryptor<'static, KeyHelper>,
}

impl Read for DecryptingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Open an encrypted message from `source` using any usable secret key of
/// the candidates.
///
/// The message is authenticated before the first plaintext byte is handed
/// out, so a failure never yields partial plaintext.
///
/// # Errors
///
/// Returns `StoreError::Decryption` if no candidate key opens the session
/// key (including locked keys and wrong passphrases), or
/// `StoreError::CorruptMessage` if the ciphertext is malformed or fails its
/// integrity check.
pub fn decrypt_message<R>(source: R, candidates: &[KeyringEntity]) -> Result<DecryptingReader>
where
    R: Read + Send + Sync + 'static,
{
    let keys: Vec<SecretKey> = candidates
        .iter()
        .flat_map(|entity| entity.usable_secret_keys().cloned())
        .collect();
    debug!("decrypting with {} usable secret key(s)", keys.len());

    let inner = DecryptorBuilder::from_reader(source)
        .map_err(classify)?
        .with_policy(POLICY, None, KeyHelper { keys })
        .map_err(classify)?;

    Ok(DecryptingReader { inner })
}

/// Map a parser failure onto the store error taxonomy.
fn classify(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<openpgp::Error>() {
        Some(openpgp::Error::MissingSessionKey(_)) => StoreError::Decryption(err.to_string()),
        _ => StoreError::CorruptMessage(err.to_string()),
    }
}

/// Offers each usable secret key to every PKESK packet.
struct KeyHelper {
    keys: Vec<SecretKey>,
}

impl VerificationHelper for KeyHelper {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        Ok(Vec::new())
    }

    fn check(&mut self, _structure: MessageStructure) -> openpgp::Result<()> {
        Ok(())
    }
}

impl DecryptionHelper for KeyHelper {
    fn decrypt<D>(
        &mut self,
        pkesks: &[PKESK],
        _skesks: &[SKESK],
        sym_algo: Option<SymmetricAlgorithm>,
        mut decrypt: D,
    ) -> openpgp::Result<Option<Fingerprint>>
    where
        D: FnMut(SymmetricAlgorithm, &SessionKey) -> bool,
    {
        for pkesk in pkesks {
            let recipient = pkesk.recipient();
            for key in &self.keys {
                if !recipient.is_wildcard() && *recipient != key.keyid() {
                    continue;
                }
                let mut keypair = match key.clone().into_keypair() {
                    Ok(keypair) => keypair,
                    Err(_) => continue,
                };
                if let Some((algo, session_key)) = pkesk.decrypt(&mut keypair, sym_algo) {
                    if decrypt(algo, &session_key) {
                        return Ok(Some(key.fingerprint()));
                    }
                }
            }
        }

        Err(openpgp::Error::MissingSessionKey(
            "no key in the key set can decrypt this message".to_string(),
        )
        .into())
    }
}
