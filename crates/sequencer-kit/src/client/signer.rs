//! Signer trait and implementations.
//!
//! A `Signer` is the narrow wallet capability the client needs: it knows the
//! address it signs for and produces EIP-191 personal-message signatures.
//! Browser wallets, hardware wallets and test doubles all fit behind it.
//!
//! # Implementations
//!
//! - [`LocalWallet`] - secp256k1 key held in memory
//! - [`FileWallet`] - Key loaded from `~/.sequencer-kit/keys`
//! - [`EnvWallet`] - Key loaded from an environment variable
//!
//! # Example
//!
//! ```rust,no_run
//! use sequencer_kit::{LocalWallet, Sequencer};
//!
//! # async fn example() -> Result<(), sequencer_kit::Error> {
//! let wallet = LocalWallet::from_private_key(
//!     "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
//! )?;
//!
//! let client = Sequencer::builder("http://127.0.0.1:8080")
//!     .signer(wallet)
//!     .build()?;
//!
//! client.transfer("0xbbb", 10u64).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use k256::ecdsa::SigningKey;

use crate::error::{Error, SignerError};
use crate::types::{
    Address, SequencedTransaction, Signature, SignedTransaction, hash_personal_message,
};

/// Future returned by [`Signer::sign_message`].
pub type SignFuture<'a> = BoxFuture<'a, Result<Signature, SignerError>>;

// ============================================================================
// Signer Trait
// ============================================================================

/// Trait for signing transactions.
///
/// # Example Implementation
///
/// ```rust
/// use sequencer_kit::{Address, Signature, SignFuture, Signer, SignerError};
///
/// struct DecliningWallet {
///     address: Address,
/// }
///
/// impl Signer for DecliningWallet {
///     fn address(&self) -> &Address {
///         &self.address
///     }
///
///     fn sign_message<'a>(&'a self, _message: &'a [u8]) -> SignFuture<'a> {
///         Box::pin(async { Err(SignerError::Declined("user closed the prompt".into())) })
///     }
/// }
/// ```
pub trait Signer: Send + Sync {
    /// The account this signer signs for.
    fn address(&self) -> &Address;

    /// Sign `message` as an EIP-191 personal message.
    ///
    /// Wallets that prompt the user may take arbitrarily long and may
    /// decline with [`SignerError::Declined`].
    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a>;
}

/// Implement `Signer` for `Arc<dyn Signer>` for convenience.
impl Signer for Arc<dyn Signer> {
    fn address(&self) -> &Address {
        (**self).address()
    }

    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        (**self).sign_message(message)
    }
}

/// Sign the canonical payload of `tx` and wrap it for submission.
pub async fn sign_transaction(
    signer: &dyn Signer,
    tx: SequencedTransaction,
) -> Result<SignedTransaction, SignerError> {
    let payload = tx.signing_payload();
    let sig = signer.sign_message(payload.as_bytes()).await?;
    Ok(SignedTransaction {
        pub_key: signer.address().clone(),
        sig,
        tx,
    })
}

// ============================================================================
// LocalWallet
// ============================================================================

/// A signer with a single secp256k1 key stored in memory.
///
/// Suitable for scripts, bots and tests.
///
/// # Example
///
/// ```rust
/// use sequencer_kit::{LocalWallet, Signer};
///
/// let wallet = LocalWallet::from_private_key(
///     "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
/// ).unwrap();
/// assert_eq!(wallet.address().as_str(), "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23");
/// ```
#[derive(Clone)]
pub struct LocalWallet {
    key: SigningKey,
    address: Address,
}

impl LocalWallet {
    /// Create a wallet from a hex private key, with or without `0x`.
    pub fn from_private_key(private_key: impl AsRef<str>) -> Result<Self, SignerError> {
        let hex_key = private_key.as_ref().trim();
        let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let bytes = hex::decode(hex_key).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self::from_signing_key(key))
    }

    /// Create a wallet with a freshly generated key.
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    pub fn from_signing_key(key: SigningKey) -> Self {
        let address = Address::from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    /// Sign synchronously. The [`Signer`] impl wraps this.
    pub fn sign_personal(&self, message: &[u8]) -> Result<Signature, SignerError> {
        let hash = hash_personal_message(message);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;
        Ok(Signature::from_parts(&signature, recovery_id))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish()
    }
}

impl Signer for LocalWallet {
    fn address(&self) -> &Address {
        &self.address
    }

    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        let result = self.sign_personal(message);
        Box::pin(async move { result })
    }
}

// ============================================================================
// FileWallet
// ============================================================================

/// A signer that loads its key from `~/.sequencer-kit/keys/{name}.json`.
///
/// The file holds `{"private_key": "0x..."}`. An `address` field, if present,
/// must match the key.
///
/// # Example
///
/// ```rust,no_run
/// use sequencer_kit::FileWallet;
///
/// // Load from ~/.sequencer-kit/keys/player-one.json
/// let wallet = FileWallet::new("player-one").unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct FileWallet {
    inner: LocalWallet,
}

/// Key file format.
#[derive(serde::Deserialize)]
struct KeyFile {
    #[serde(alias = "secret_key")]
    private_key: String,
    #[serde(default)]
    address: Option<String>,
}

impl FileWallet {
    /// Load a named key from the standard key directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The home directory cannot be determined
    /// - The key file doesn't exist or cannot be parsed
    /// - The stored address does not match the key
    #[cfg(feature = "file-signer")]
    pub fn new(name: impl AsRef<str>) -> Result<Self, Error> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
        let path = home
            .join(".sequencer-kit")
            .join("keys")
            .join(format!("{}.json", name.as_ref()));

        Self::from_file(&path)
    }

    /// Load a key from a specific file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SignerError::KeyFile(format!("failed to read {}: {}", path.display(), e))
        })?;

        let file: KeyFile = serde_json::from_str(&content).map_err(|e| {
            SignerError::KeyFile(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let inner = LocalWallet::from_private_key(&file.private_key)?;
        if let Some(expected) = file.address {
            let expected = Address::new(expected)?;
            if expected != inner.address {
                return Err(SignerError::KeyFile(format!(
                    "{} declares address {} but the key belongs to {}",
                    path.display(),
                    expected,
                    inner.address
                ))
                .into());
            }
        }
        Ok(Self { inner })
    }
}

impl Signer for FileWallet {
    fn address(&self) -> &Address {
        self.inner.address()
    }

    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        self.inner.sign_message(message)
    }
}

// ============================================================================
// EnvWallet
// ============================================================================

/// Environment variable holding the default private key.
pub const PRIVATE_KEY_ENV: &str = "SEQUENCER_PRIVATE_KEY";

/// A signer that loads its key from an environment variable.
///
/// # Example
///
/// ```rust,no_run
/// use sequencer_kit::EnvWallet;
///
/// // With SEQUENCER_PRIVATE_KEY set:
/// let wallet = EnvWallet::new().unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct EnvWallet {
    inner: LocalWallet,
}

impl EnvWallet {
    /// Load from `SEQUENCER_PRIVATE_KEY`.
    pub fn new() -> Result<Self, Error> {
        Self::from_env_var(PRIVATE_KEY_ENV)
    }

    /// Load from a custom environment variable.
    pub fn from_env_var(key_var: &str) -> Result<Self, Error> {
        let private_key = std::env::var(key_var)
            .map_err(|_| Error::Config(format!("Environment variable {} not set", key_var)))?;
        let inner = LocalWallet::from_private_key(&private_key)?;
        Ok(Self { inner })
    }
}

impl Signer for EnvWallet {
    fn address(&self) -> &Address {
        self.inner.address()
    }

    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        self.inner.sign_message(message)
    }
}
