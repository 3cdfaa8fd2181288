//! Integration test: full store lifecycle across two key holders.
//!
//! Tests the complete lifecycle:
//! 1. Generate keys for two holders and export keyrings
//! 2. Create a shared store and a substore for one holder
//! 3. Write entries to both
//! 4. Reopen with each holder's own keyring and read back
//! 5. Verify substore isolation and failure modes

use std::io::{Read, Write};

use gpgstore::{parse_keyring, KeyringEntity, Store, StoreError, MARKER_FILE};
use sequoia_openpgp::cert::prelude::*;
use sequoia_openpgp::serialize::Serialize;

const ALICE: &str = "Alice <alice@example.org>";
const BOB: &str = "Bob <bob@example.org>";

/// Generate a key whose secret material is protected by `passphrase`.
fn generate(userid: &str, passphrase: &str) -> Cert {
    let (cert, _revocation) = CertBuilder::new()
        .add_userid(userid)
        .add_transport_encryption_subkey()
        .set_password(Some(passphrase.into()))
        .generate()
        .expect("key generation failed");
    cert
}

fn keyring(certs: &[&Cert]) -> Vec<u8> {
    let mut out = Vec::new();
    for cert in certs {
        cert.as_tsk().serialize(&mut out).expect("serialize failed");
    }
    out
}

fn write_entry(store: &Store, name: &str, plaintext: &[u8]) {
    let mut writer = store.write(name).expect("write should start");
    writer.write_all(plaintext).expect("plaintext write failed");
    writer.close().expect("close should commit the entry");
}

fn read_entry(store: &Store, name: &str, passphrase: &str) -> gpgstore::Result<Vec<u8>> {
    let mut reader = store.read(name, passphrase.as_bytes())?;
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

#[test]
fn full_workflow_shared_store_and_substore() {
    // ── Step 1: Keys and keyrings ───────────────────────────────────────
    let alice = generate(ALICE, "alice-pass");
    let bob = generate(BOB, "bob-pass");

    let shared_keyring = keyring(&[&alice, &bob]);
    let alice_keyring = keyring(&[&alice]);
    let bob_keyring = keyring(&[&bob]);

    // ── Step 2: Create stores ───────────────────────────────────────────
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");

    let everyone = parse_keyring(&shared_keyring).unwrap();
    let store = Store::create(&root, everyone.clone()).expect("create root store");
    assert_eq!(store.identities(), vec![ALICE, BOB]);

    let bob_only: Vec<KeyringEntity> = everyone
        .iter()
        .filter(|entity| entity.identities().contains(&BOB.to_string()))
        .cloned()
        .collect();
    let team = Store::create(root.join("team"), bob_only).expect("create substore");
    assert_eq!(team.keys().len(), 1);

    // ── Step 3: Write entries ───────────────────────────────────────────
    write_entry(&store, "email.gpg", b"correct horse battery staple\n");
    write_entry(&store, "bank.gpg", b"1234\n");
    write_entry(&team, "deploy.gpg", b"deploy token\n");

    assert_eq!(store.list().unwrap(), vec!["bank.gpg", "email.gpg"]);
    assert_eq!(store.sub_stores().unwrap(), vec!["team"]);
    assert_eq!(team.list().unwrap(), vec!["deploy.gpg"]);

    // ── Step 4: Each holder reads the shared entries ────────────────────
    let as_alice = Store::open(&root, alice_keyring.as_slice()).unwrap();
    let as_bob = Store::open(&root, bob_keyring.as_slice()).unwrap();
    assert_eq!(as_alice.keys().len(), 1);
    assert_eq!(as_bob.keys().len(), 1);

    assert_eq!(
        read_entry(&as_alice, "email.gpg", "alice-pass").unwrap(),
        b"correct horse battery staple\n"
    );
    assert_eq!(read_entry(&as_bob, "bank.gpg", "bob-pass").unwrap(), b"1234\n");

    // ── Step 5: Substore isolation ──────────────────────────────────────
    let alice_entities = parse_keyring(&alice_keyring).unwrap();
    let alice_team = as_alice.open_sub_store("team", &alice_entities).unwrap();
    assert!(alice_team.keys().is_empty(), "alice is not a team recipient");
    assert!(matches!(
        read_entry(&alice_team, "deploy.gpg", "alice-pass"),
        Err(StoreError::Decryption(_))
    ));

    let bob_entities = parse_keyring(&bob_keyring).unwrap();
    let bob_team = as_bob.open_sub_store("team", &bob_entities).unwrap();
    assert_eq!(
        read_entry(&bob_team, "deploy.gpg", "bob-pass").unwrap(),
        b"deploy token\n"
    );

    // Wrong passphrase never yields plaintext.
    assert!(matches!(
        read_entry(&bob_team, "deploy.gpg", "alice-pass"),
        Err(StoreError::Decryption(_))
    ));
}

#[test]
fn full_workflow_entry_written_by_one_reader_decrypts_for_all() {
    let alice = generate(ALICE, "alice-pass");
    let bob = generate(BOB, "bob-pass");

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MARKER_FILE), format!("{ALICE}\n{BOB}\n")).unwrap();

    // Alice writes using a keyring that also carries Bob's public key.
    let shared = keyring(&[&alice, &bob]);
    let writer_view = Store::open(dir.path(), shared.as_slice()).unwrap();
    assert_eq!(writer_view.keys().len(), 2);
    write_entry(&writer_view, "shared.gpg", b"for both of us");

    // Bob reads with his keyring alone.
    let bob_view = Store::open(dir.path(), keyring(&[&bob]).as_slice()).unwrap();
    assert_eq!(
        read_entry(&bob_view, "shared.gpg", "bob-pass").unwrap(),
        b"for both of us"
    );
}

#[test]
fn full_workflow_nested_substores_are_walked_one_level_at_a_time() {
    let alice = generate(ALICE, "alice-pass");
    let entities = parse_keyring(&keyring(&[&alice])).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    let top = Store::create(&root, entities.clone()).unwrap();
    let middle = Store::create(root.join("middle"), entities.clone()).unwrap();
    Store::create(root.join("middle").join("bottom"), entities.clone()).unwrap();

    assert_eq!(top.sub_stores().unwrap(), vec!["middle"]);
    assert_eq!(middle.sub_stores().unwrap(), vec!["bottom"]);

    let reopened = top.open_sub_store("middle", &entities).unwrap();
    assert_eq!(reopened.sub_stores().unwrap(), vec!["bottom"]);
}
