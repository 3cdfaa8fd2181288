//! Streaming OpenPGP encryption to a set of recipients.

use std::io::{self, Write};

use sequoia_openpgp::serialize::stream::{Encryptor2, LiteralWriter, Message, Recipient};

use super::keyring::KeyringEntity;
use super::POLICY;
use crate::error::{Result, StoreError};

/// Plaintext sink that enciphers into an underlying writer.
///
/// The OpenPGP message is only complete once [`EncryptingWriter::finish`]
/// has returned successfully. Dropping the writer without finishing leaves
/// a truncated message in the sink.
pub struct EncryptingWriter<'a> {
    message: Message<'a>,
}

impl EncryptingWriter<'_> {
    /// Flush buffered data and write the trailing packets.
    pub fn finish(self) -> Result<()> {
        self.message
            .finalize()
            .map_err(|e| StoreError::Encryption(e.to_string()))
    }
}

impl Write for EncryptingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.message.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.message.flush()
    }
}

/// Start an encrypted message in `sink` addressed to every recipient.
///
/// Each recipient contributes all of its alive, policy-compliant keys
/// that are marked for storage or transport encryption. The message is not
/// signed and not armored.
///
/// # Errors
///
/// Returns `StoreError::Encryption` if no recipient has a usable
/// encryption key, or if the message headers cannot be written.
pub fn encrypt_to<'a, W>(sink: W, recipients: &'a [KeyringEntity]) -> Result<EncryptingWriter<'a>>
where
    W: Write + Send + Sync + 'a,
{
    let keys: Vec<Recipient<'a>> = recipients
        .iter()
        .flat_map(|entity| {
            entity
                .cert()
                .keys()
                .with_policy(POLICY, None)
                .supported()
                .alive()
                .for_storage_encryption()
                .for_transport_encryption()
        })
        .map(Recipient::from)
        .collect();

    if keys.is_empty() {
        return Err(StoreError::Encryption(
            "no recipient has a usable encryption key".to_string(),
        ));
    }

    let message = Message::new(sink);
    let message = Encryptor2::for_recipients(message, keys)
        .build()
        .map_err(|e| StoreError::Encryption(e.to_string()))?;
    let message = LiteralWriter::new(message)
        .build()
        .map_err(|e| StoreError::Encryption(e.to_string()))?;

    Ok(EncryptingWriter { message })
}
