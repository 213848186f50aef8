//! Fingerprints, signing keys and the verification policy.
//!
//! The protocol core never touches key formats directly: it signs through a
//! [`MessageSigner`] and verifies through a [`SignatureVerifier`]. The Ed25519
//! implementations here ([`SenderKey`], [`ReceiverKey`]) are what the CLI and
//! the drop-directory driver plug in. Ed25519 signatures are deterministic, so
//! signing the same fingerprint twice yields the same packet stream.
//!
//! Key files are plain hex text: 64 characters for either a secret seed or a
//! public key, surrounding whitespace ignored.

use crate::core::packet::Signature;
use crate::error::{constants, CourierError, Result};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

/// Length in bytes of the SHA-256 digest behind every fingerprint
pub const DIGEST_LEN: usize = 32;

/// Hex-encoded SHA-256 of `text`.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Private-key side of the key boundary.
pub trait MessageSigner {
    /// Sign the raw digest bytes behind a fingerprint
    fn sign_fingerprint(&self, digest: &[u8]) -> Result<Vec<u8>>;
}

/// Public-key side of the key boundary.
pub trait SignatureVerifier: Send + Sync {
    /// Returns true when `signature` is a valid signature over `digest`
    fn verify_fingerprint(&self, digest: &[u8], signature: &[u8]) -> bool;
}

/// Sender-held Ed25519 signing key.
pub struct SenderKey {
    signing_key: SigningKey,
}

impl SenderKey {
    /// Generate a fresh key from OS entropy
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; 32];
        getrandom::fill(&mut seed)
            .map_err(|_| CourierError::InvalidKey(constants::ERR_KEY_ENTROPY.into()))?;
        let key = Self::from_seed(seed);
        seed.zeroize();
        Ok(key)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let mut seed = decode_key_hex(text)?;
        let key = Self::from_seed(seed);
        seed.zeroize();
        Ok(key)
    }

    /// Hex-encoded secret seed, wiped on drop
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing_key.to_bytes()))
    }

    /// Matching verification key for the receiving side
    pub fn receiver_key(&self) -> ReceiverKey {
        ReceiverKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = Zeroizing::new(std::fs::read_to_string(path)?);
        debug!(path = %path.display(), "Loaded private key");
        Self::from_hex(&contents)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_hex().as_bytes())?;
        Ok(())
    }
}

impl MessageSigner for SenderKey {
    fn sign_fingerprint(&self, digest: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(digest).to_bytes().to_vec())
    }
}

impl fmt::Debug for SenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderKey")
            .field("public", &hex::encode(self.signing_key.verifying_key().to_bytes()))
            .finish_non_exhaustive()
    }
}

/// Receiver-held Ed25519 verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverKey {
    verifying_key: VerifyingKey,
}

impl ReceiverKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| CourierError::InvalidKey(e.to_string()))?;
        Ok(Self { verifying_key })
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        Self::from_bytes(decode_key_hex(text)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loaded public key");
        Self::from_hex(&contents)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_hex())?;
        Ok(())
    }
}

impl SignatureVerifier for ReceiverKey {
    fn verify_fingerprint(&self, digest: &[u8], signature: &[u8]) -> bool {
        match ed25519_dalek::Signature::from_slice(signature) {
            Ok(sig) => self.verifying_key.verify(digest, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

fn decode_key_hex(text: &str) -> Result<[u8; 32]> {
    let bytes = Zeroizing::new(
        hex::decode(text.trim())
            .map_err(|_| CourierError::InvalidKey(constants::ERR_KEY_ENCODING.into()))?,
    );
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| CourierError::InvalidKey(constants::ERR_KEY_LENGTH.into()))
}

/// Sign a fingerprint and return the signature as it travels in packets.
pub fn sign_fingerprint(signer: &dyn MessageSigner, fingerprint: &str) -> Result<Signature> {
    let digest = hex::decode(fingerprint)
        .map_err(|_| CourierError::InvalidKey(constants::ERR_FINGERPRINT_ENCODING.into()))?;
    let signature = signer.sign_fingerprint(&digest)?;
    Ok(Signature::Signed(hex::encode(signature)))
}

/// Receiver-side authenticity policy applied when a message is built.
pub enum Verification {
    /// Every message must carry a valid signature from this key.
    Required(Box<dyn SignatureVerifier>),
    /// Only unsigned messages are accepted.
    AllowUnsigned,
}

impl Verification {
    pub fn required(verifier: impl SignatureVerifier + 'static) -> Self {
        Verification::Required(Box::new(verifier))
    }

    /// Check `signature` against `fingerprint` under this policy.
    ///
    /// # Errors
    /// Returns `CourierError::AuthenticityError` when the signature is
    /// missing, unverifiable or invalid.
    pub fn check(&self, fingerprint: &str, signature: &Signature) -> Result<()> {
        match (self, signature) {
            (Verification::AllowUnsigned, Signature::Unsigned) => Ok(()),
            (Verification::AllowUnsigned, Signature::Signed(_)) => Err(
                CourierError::AuthenticityError(constants::ERR_UNVERIFIABLE_SIGNATURE.into()),
            ),
            (Verification::Required(_), Signature::Unsigned) => Err(
                CourierError::AuthenticityError(constants::ERR_SIGNATURE_REQUIRED.into()),
            ),
            (Verification::Required(verifier), Signature::Signed(sig)) => {
                let digest = hex::decode(fingerprint).map_err(|_| {
                    CourierError::AuthenticityError(constants::ERR_FINGERPRINT_ENCODING.into())
                })?;
                let sig_bytes = hex::decode(sig).map_err(|_| {
                    CourierError::AuthenticityError(constants::ERR_SIGNATURE_ENCODING.into())
                })?;

                if verifier.verify_fingerprint(&digest, &sig_bytes) {
                    Ok(())
                } else {
                    warn!(fingerprint, "Signature verification failed");
                    Err(CourierError::AuthenticityError(
                        constants::ERR_SIGNATURE_INVALID.into(),
                    ))
                }
            }
        }
    }
}

impl fmt::Debug for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Required(_) => f.write_str("Verification::Required"),
            Verification::AllowUnsigned => f.write_str("Verification::AllowUnsigned"),
        }
    }
}
