//! gpgstore CLI — `gps` command.
//!
//! Provides a command-line interface for creating password stores,
//! listing their entries and substores, and inserting or showing
//! encrypted entries.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use zeroize::Zeroizing;

use gpgstore::{bind_keys, parse_keyring, KeyringEntity, Store};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME not set"))
}

/// `--store`, else `$PASSWORD_STORE_DIR`, else `~/.password-store`.
fn store_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os("PASSWORD_STORE_DIR") {
        return Ok(PathBuf::from(path));
    }
    Ok(home_dir()?.join(".password-store"))
}

/// `--keyring`, else `$GPGSTORE_KEYRING`, else `~/.gpgstore/keyring.pgp`.
fn keyring_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os("GPGSTORE_KEYRING") {
        return Ok(PathBuf::from(path));
    }
    Ok(home_dir()?.join(".gpgstore").join("keyring.pgp"))
}

/// Append the entry extension unless the caller already gave it.
fn entry_file_name(name: &str) -> String {
    if name.ends_with(gpgstore::store::ENTRY_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{}", gpgstore::store::ENTRY_EXTENSION)
    }
}

// ── Passphrase helper ─────────────────────────────────────────────────────────

fn read_passphrase(prompt: &str) -> Result<Zeroizing<String>> {
    eprint!("{prompt}");
    let mut line = Zeroizing::new(String::new());
    io::stdin()
        .read_line(&mut line)
        .context("failed to read passphrase")?;
    Ok(Zeroizing::new(
        line.trim_end_matches(|c| c == '\r' || c == '\n').to_string(),
    ))
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// gpgstore CLI — keep secrets in a directory of OpenPGP-encrypted files.
#[derive(Parser, Debug)]
#[command(
    name = "gps",
    about = "gpgstore CLI",
    version,
    long_about = "gps — gpgstore CLI\n\nCreate password stores, list entries and substores,\nand insert or show entries encrypted to the store's recipients."
)]
struct Cli {
    /// Store directory (default: $PASSWORD_STORE_DIR or ~/.password-store)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Keyring file (default: $GPGSTORE_KEYRING or ~/.gpgstore/keyring.pgp)
    #[arg(long, global = true)]
    keyring: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new store for some or all keyring keys
    Init {
        /// Recipient identity to bind (repeatable; default: every key)
        #[arg(long = "identity")]
        identities: Vec<String>,
    },

    /// List entries and substores
    Ls {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encrypt stdin into an entry
    Insert {
        /// Entry name (".gpg" is appended when missing)
        name: String,
    },

    /// Decrypt an entry to stdout
    Show {
        /// Entry name (".gpg" is appended when missing)
        name: String,
    },
}

/// JSON shape of `gps ls --json`.
#[derive(Debug, Serialize)]
struct Listing {
    root: String,
    entries: Vec<String>,
    substores: Vec<String>,
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = store_dir(cli.store).and_then(|store| {
        let keyring = keyring_path(cli.keyring)?;
        match cli.command {
            Commands::Init { identities } => cmd_init(&store, &keyring, &identities, verbose),
            Commands::Ls { json } => cmd_ls(&store, &keyring, json, verbose),
            Commands::Insert { name } => cmd_insert(&store, &keyring, &name, verbose),
            Commands::Show { name } => cmd_show(&store, &keyring, &name),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Command implementations ───────────────────────────────────────────────────

fn load_keyring(path: &Path) -> Result<Vec<KeyringEntity>> {
    log::debug!("loading keyring {}", path.display());
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read keyring {}", path.display()))?;
    parse_keyring(&bytes).with_context(|| format!("failed to parse keyring {}", path.display()))
}

fn open_store(store: &Path, keyring: &Path) -> Result<Store> {
    let keyring = load_keyring(keyring)?;
    Ok(Store::from_keyring(store, &keyring))
}

/// `gps init [--identity ID]...`
fn cmd_init(store: &Path, keyring: &Path, identities: &[String], verbose: bool) -> Result<()> {
    let keyring = load_keyring(keyring)?;
    let keys = if identities.is_empty() {
        keyring
    } else {
        bind_keys(&keyring, identities)
    };
    if keys.is_empty() {
        bail!("no keyring key carries any of the given identities");
    }

    let created = Store::create(store, keys)
        .with_context(|| format!("failed to create store {}", store.display()))?;

    println!("Created store at {}", created.root().display());
    for key in created.keys() {
        println!("  {}", key.identities().join(", "));
        if verbose {
            println!("    Fingerprint: {}", key.fingerprint());
        }
    }

    Ok(())
}

/// `gps ls [--json]`
fn cmd_ls(store: &Path, keyring: &Path, json: bool, verbose: bool) -> Result<()> {
    let store = open_store(store, keyring)?;
    let entries = store.list().context("failed to list entries")?;
    let substores = store.sub_stores().context("failed to list substores")?;

    if json {
        let listing = Listing {
            root: store.root().display().to_string(),
            entries,
            substores,
        };
        let json = serde_json::to_string_pretty(&listing).context("failed to serialize listing")?;
        println!("{json}");
        return Ok(());
    }

    println!("Store: {}", store.root().display());
    if verbose {
        println!("  Recipients: {}", store.identities().join(", "));
        println!("  Bound keys: {}", store.keys().len());
    }
    for entry in &entries {
        println!("  {entry}");
    }
    for sub in &substores {
        println!("  {sub}/");
    }
    if entries.is_empty() && substores.is_empty() {
        println!("  (empty)");
    }

    Ok(())
}

/// `gps insert NAME`
fn cmd_insert(store: &Path, keyring: &Path, name: &str, verbose: bool) -> Result<()> {
    let store = open_store(store, keyring)?;
    let file_name = entry_file_name(name);

    let mut writer = store
        .write(&file_name)
        .with_context(|| format!("failed to start entry {file_name}"))?;
    let written = io::copy(&mut io::stdin().lock(), &mut writer)
        .with_context(|| format!("failed to encrypt entry {file_name}"))?;
    writer
        .close()
        .with_context(|| format!("failed to save entry {file_name}"))?;

    println!("Saved {file_name}");
    if verbose {
        println!("  Bytes:      {written}");
        println!("  Recipients: {}", store.keys().len());
    }

    Ok(())
}

/// `gps show NAME`
fn cmd_show(store: &Path, keyring: &Path, name: &str) -> Result<()> {
    let store = open_store(store, keyring)?;
    let file_name = entry_file_name(name);

    let passphrase = read_passphrase("Passphrase: ")?;
    let mut reader = store
        .read(&file_name, passphrase.as_bytes())
        .with_context(|| format!("failed to decrypt entry {file_name}"))?;

    let mut stdout = io::stdout().lock();
    io::copy(&mut reader, &mut stdout).context("failed to write plaintext")?;
    stdout.flush()?;

    Ok(())
}
