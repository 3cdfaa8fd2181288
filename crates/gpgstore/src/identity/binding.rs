//! Key-set binding: select the keyring entities named by a marker file.

use std::collections::HashSet;

use log::debug;

use crate::crypto::KeyringEntity;

/// Select every keyring entity carrying at least one of `identities`.
///
/// Each entity appears at most once, however many of its identities
/// match. Keyring entries sharing a fingerprint are copies of one entity
/// and are merged, so secret material from any copy is kept. Keyring
/// order of first appearance is preserved.
pub fn bind_keys(keyring: &[KeyringEntity], identities: &[String]) -> Vec<KeyringEntity> {
    let wanted: HashSet<&str> = identities.iter().map(String::as_str).collect();
    let mut bound: Vec<KeyringEntity> = Vec::new();

    let matching = keyring.iter().filter(|entity| {
        entity
            .identities()
            .iter()
            .any(|id| wanted.contains(id.as_str()))
    });

    for entity in matching {
        let fingerprint = entity.cert().fingerprint();
        match bound
            .iter_mut()
            .find(|existing| existing.cert().fingerprint() == fingerprint)
        {
            Some(existing) => {
                debug!("merging repeated keyring entry {}", entity.fingerprint());
                existing.merge(entity);
            }
            None => {
                debug!("bound key {}", entity.fingerprint());
                bound.push(entity.clone());
            }
        }
    }

    bound
}
