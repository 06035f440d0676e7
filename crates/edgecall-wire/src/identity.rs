//! Ed25519 identity of an edge agent.
//!
//! An [`Identity`] owns the agent's private signing key. The only thing that
//! ever leaves it is a signature; the key bytes are not exposed, not printed
//! by `Debug`, and transient copies made while parsing are zeroized.
//!
//! Key material is accepted as 32 raw bytes or as 64 hex characters (with or
//! without a `0x` prefix), which is how agent keys are usually stored.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH};
use edgecall_types::{EdgeError, SigningError};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

/// Public half of an agent identity. Safe to disclose.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicIdentity(VerifyingKey);

impl PublicIdentity {
    /// Parse a hex-encoded 32-byte Ed25519 public key.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes: [u8; 32] = hex::decode(s)
            .map_err(|e| format!("invalid public key hex: {e}"))?
            .as_slice()
            .try_into()
            .map_err(|_| "invalid public key length (expected 32 bytes)".to_string())?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|e| format!("invalid public key: {e}"))
    }

    /// Raw public key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl fmt::Display for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.to_bytes()))
    }
}

impl fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicIdentity({self})")
    }
}

impl TryFrom<String> for PublicIdentity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<PublicIdentity> for String {
    fn from(id: PublicIdentity) -> Self {
        id.to_string()
    }
}

/// Anything that can sign canonical envelope bytes on behalf of an agent.
///
/// [`Identity`] is the in-memory implementation. External key holders
/// (hardware tokens, remote signers) implement this too and may fail per call.
pub trait RequestSigner: Send + Sync {
    /// Public identity the signatures verify under.
    fn public_identity(&self) -> PublicIdentity;

    /// Sign `message`.
    fn sign_bytes(&self, message: &[u8]) -> Result<Signature, SigningError>;
}

/// An agent's private signing key together with its public identity.
pub struct Identity {
    signing_key: SigningKey,
    public: PublicIdentity,
}

impl Identity {
    /// Build an identity from raw key material.
    ///
    /// Accepts either 32 raw bytes or the ASCII bytes of a 64-character hex
    /// string. Anything else, or an all-zero key, is a construction error.
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, EdgeError> {
        if bytes.len() == SECRET_KEY_LENGTH {
            let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
            seed.copy_from_slice(bytes);
            return Self::from_seed(&seed);
        }
        let text = std::str::from_utf8(bytes).map_err(|_| {
            EdgeError::Construction(format!(
                "key material must be {SECRET_KEY_LENGTH} raw bytes or hex text, got {} bytes",
                bytes.len()
            ))
        })?;
        Self::from_hex(text)
    }

    /// Build an identity from a hex-encoded 32-byte seed.
    pub fn from_hex(hex_key: &str) -> Result<Self, EdgeError> {
        let trimmed = hex_key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let decoded = Zeroizing::new(
            hex::decode(trimmed)
                .map_err(|e| EdgeError::Construction(format!("invalid key hex: {e}")))?,
        );
        if decoded.len() != SECRET_KEY_LENGTH {
            return Err(EdgeError::Construction(format!(
                "invalid key length: expected {SECRET_KEY_LENGTH} bytes, got {}",
                decoded.len()
            )));
        }
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
        seed.copy_from_slice(&decoded);
        Self::from_seed(&seed)
    }

    /// Load a hex-encoded key from a file.
    pub fn load(path: &Path) -> Result<Self, EdgeError> {
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            EdgeError::Construction(format!("cannot read key file {}: {e}", path.display()))
        })?);
        Self::from_hex(&contents)
    }

    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public = PublicIdentity(signing_key.verifying_key());
        Self {
            signing_key,
            public,
        }
    }

    fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Result<Self, EdgeError> {
        if seed.iter().all(|b| *b == 0) {
            return Err(EdgeError::Construction(
                "key material is all zeroes".to_string(),
            ));
        }
        let signing_key = SigningKey::from_bytes(seed);
        let public = PublicIdentity(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            public,
        })
    }

    /// The public identity derived from this key.
    pub fn public(&self) -> &PublicIdentity {
        &self.public
    }
}

impl RequestSigner for Identity {
    fn public_identity(&self) -> PublicIdentity {
        self.public
    }

    fn sign_bytes(&self, message: &[u8]) -> Result<Signature, SigningError> {
        self.signing_key
            .try_sign(message)
            .map_err(|e| SigningError::Backend(e.to_string()))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    const TEST_KEY_HEX: &str = "03b7dfc824b0cbcfe789ec0ce4571f3460befd0490e3d0d2aad8e3c07dbcce14";

    #[test]
    fn test_hex_text_as_bytes() {
        let a = Identity::from_key_bytes(TEST_KEY_HEX.as_bytes()).unwrap();
        let b = Identity::from_hex(TEST_KEY_HEX).unwrap();
        assert_eq!(a.public(), b.public());
    }

    #[test]
    fn test_raw_bytes() {
        let raw = hex::decode(TEST_KEY_HEX).unwrap();
        let a = Identity::from_key_bytes(&raw).unwrap();
        let b = Identity::from_hex(&format!("0x{TEST_KEY_HEX}")).unwrap();
        assert_eq!(a.public(), b.public());
    }

    #[test]
    fn test_public_identity_is_deterministic() {
        let a = Identity::from_hex(TEST_KEY_HEX).unwrap();
        let b = Identity::from_hex(TEST_KEY_HEX).unwrap();
        assert_eq!(a.public().to_string(), b.public().to_string());
        assert_eq!(a.public().to_string().len(), 64);
    }

    #[test]
    fn test_invalid_material_is_construction_error() {
        for bad in [&b"not hex at all"[..], &b"abcd"[..], &[0xffu8; 7][..]] {
            match Identity::from_key_bytes(bad) {
                Err(EdgeError::Construction(_)) => {}
                other => panic!("expected construction error, got {other:?}"),
            }
        }
        assert!(Identity::from_key_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let id = Identity::from_hex(TEST_KEY_HEX).unwrap();
        let dbg = format!("{id:?}");
        assert!(!dbg.contains(TEST_KEY_HEX));
        assert!(dbg.contains(&id.public().to_string()));
    }

    #[test]
    fn test_sign_bytes_verifies() {
        let id = Identity::generate();
        let sig = id.sign_bytes(b"payload").unwrap();
        assert!(id
            .public_identity()
            .verifying_key()
            .verify(b"payload", &sig)
            .is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.key");
        std::fs::write(&path, format!("{TEST_KEY_HEX}\n")).unwrap();
        let loaded = Identity::load(&path).unwrap();
        let direct = Identity::from_hex(TEST_KEY_HEX).unwrap();
        assert_eq!(loaded.public(), direct.public());

        let missing = Identity::load(&dir.path().join("missing.key"));
        assert!(matches!(missing, Err(EdgeError::Construction(_))));
    }

    #[test]
    fn test_public_identity_serde() {
        let id = Identity::generate();
        let json = serde_json::to_string(id.public()).unwrap();
        let back: PublicIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, id.public());
        assert!(serde_json::from_str::<PublicIdentity>("\"zz\"").is_err());
    }
}
