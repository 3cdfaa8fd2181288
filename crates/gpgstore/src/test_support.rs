//! Key fixtures shared by the unit tests.

use sequoia_openpgp::cert::prelude::*;
use sequoia_openpgp::serialize::Serialize;

/// Passphrase protecting every generated test key.
pub(crate) const PASSPHRASE: &str = "testing";

/// Generate a passphrase-protected Curve25519 certificate with an
/// encryption subkey and the given user IDs.
pub(crate) fn generate_cert(userids: &[&str]) -> Cert {
    let mut builder = CertBuilder::new()
        .add_transport_encryption_subkey()
        .set_password(Some(PASSPHRASE.into()));
    for userid in userids {
        builder = builder.add_userid(*userid);
    }
    let (cert, _revocation) = builder.generate().expect("key generation failed");
    cert
}

/// Serialize certificates, secret keys included, into keyring bytes.
pub(crate) fn keyring_bytes(certs: &[Cert]) -> Vec<u8> {
    let mut out = Vec::new();
    for cert in certs {
        cert.as_tsk()
            .serialize(&mut out)
            .expect("keyring serialization failed");
    }
    out
}
