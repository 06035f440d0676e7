//! Canonical request envelopes and their signatures.
//!
//! The bytes fed to the signature algorithm are:
//!
//! 1. The domain tag [`ENVELOPE_DOMAIN`].
//! 2. `network_id` as 8-byte big-endian.
//! 3. `node`, `kind`, `path`, `method`, `body`, each as a 4-byte big-endian
//!    length followed by the UTF-8 bytes.
//! 4. `nonce` as 8-byte big-endian.
//!
//! Field order is fixed and every variable-length field is length-prefixed,
//! so two different envelopes can never produce the same byte string.

use crate::identity::{PublicIdentity, RequestSigner};
use ed25519_dalek::{Signature, Verifier};
use edgecall_types::{CallKind, Method, NodeId, SigningError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain separation tag prefixed to every canonical envelope.
pub const ENVELOPE_DOMAIN: &[u8] = b"edgecall/envelope/v1";

/// The fields of a request, before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFields {
    pub network_id: u64,
    pub node: NodeId,
    pub kind: CallKind,
    pub path: String,
    pub method: Method,
    pub body: String,
    pub nonce: u64,
}

impl RequestFields {
    /// Encode the fields in canonical form.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, SigningError> {
        let mut out = Vec::with_capacity(
            ENVELOPE_DOMAIN.len()
                + 16
                + 5 * 4
                + self.node.as_str().len()
                + self.path.len()
                + self.body.len()
                + 16,
        );
        out.extend_from_slice(ENVELOPE_DOMAIN);
        out.extend_from_slice(&self.network_id.to_be_bytes());
        push_field(&mut out, "node", self.node.as_str().as_bytes())?;
        push_field(&mut out, "kind", self.kind.as_str().as_bytes())?;
        push_field(&mut out, "path", self.path.as_bytes())?;
        push_field(&mut out, "method", self.method.as_str().as_bytes())?;
        push_field(&mut out, "body", self.body.as_bytes())?;
        out.extend_from_slice(&self.nonce.to_be_bytes());
        Ok(out)
    }
}

fn push_field(out: &mut Vec<u8>, field: &'static str, bytes: &[u8]) -> Result<(), SigningError> {
    let len = u32::try_from(bytes.len()).map_err(|_| SigningError::FieldTooLarge {
        field,
        size: bytes.len(),
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// A request bundled with a signature over its canonical bytes.
///
/// Fields are only readable: once signed, an envelope cannot be changed in
/// place. An envelope altered in transit (for example through its serialized
/// form) fails [`SignedRequest::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    #[serde(flatten)]
    fields: RequestFields,
    /// Hex-encoded Ed25519 signature.
    signature: String,
    signer: PublicIdentity,
}

/// Sign `fields` on behalf of `signer`.
///
/// The inputs are borrowed and left untouched; the returned envelope owns a
/// copy of them.
pub fn sign_request(
    signer: &dyn RequestSigner,
    fields: &RequestFields,
) -> Result<SignedRequest, SigningError> {
    let bytes = fields.canonical_bytes()?;
    let signature = signer.sign_bytes(&bytes)?;
    Ok(SignedRequest {
        fields: fields.clone(),
        signature: hex::encode(signature.to_bytes()),
        signer: signer.public_identity(),
    })
}

impl SignedRequest {
    pub fn fields(&self) -> &RequestFields {
        &self.fields
    }

    pub fn network_id(&self) -> u64 {
        self.fields.network_id
    }

    pub fn node(&self) -> &NodeId {
        &self.fields.node
    }

    pub fn kind(&self) -> CallKind {
        self.fields.kind
    }

    pub fn path(&self) -> &str {
        &self.fields.path
    }

    pub fn method(&self) -> Method {
        self.fields.method
    }

    pub fn body(&self) -> &str {
        &self.fields.body
    }

    pub fn nonce(&self) -> u64 {
        self.fields.nonce
    }

    /// Hex-encoded signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn signer(&self) -> &PublicIdentity {
        &self.signer
    }

    /// Hex SHA-256 of the canonical bytes. Used as a local request id.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        match self.fields.canonical_bytes() {
            Ok(bytes) => hasher.update(&bytes),
            Err(_) => hasher.update(self.signature.as_bytes()),
        }
        hex::encode(hasher.finalize())
    }

    /// Check the signature against the embedded signer identity.
    ///
    /// Returns `Err(description)` when the envelope was altered after signing
    /// or the signature is malformed.
    pub fn verify(&self) -> Result<(), String> {
        let bytes = self
            .fields
            .canonical_bytes()
            .map_err(|e| format!("cannot canonicalize envelope: {e}"))?;

        let sig_bytes: [u8; 64] = hex::decode(&self.signature)
            .map_err(|e| format!("invalid signature hex: {e}"))?
            .as_slice()
            .try_into()
            .map_err(|_| "invalid signature length (expected 64 bytes)".to_string())?;
        let signature = Signature::from_bytes(&sig_bytes);

        self.signer
            .verifying_key()
            .verify(&bytes, &signature)
            .map_err(|e| format!("signature verification failed: {e}"))
    }
}
