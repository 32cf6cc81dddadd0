//! Digests, HMAC signatures and RSA key-pair generation.
//!
//! MD5 and SHA-1 are offered for compatibility with existing checksums and
//! legacy protocols only. Neither is collision resistant; do not use them to
//! protect anything.
//!
//! Key material is generated fresh on every call and never cached or logged.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use md5::Md5;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::CryptoError;

const PEM_LINE_WIDTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DigestAlgorithm {
    /// Compatibility only, not collision resistant.
    Md5,
    /// Compatibility only, not collision resistant.
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 6] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CryptoError;

    /// Accepts `SHA256`, `sha-256`, `SHA_256` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == normalized)
            .ok_or_else(|| CryptoError::Unsupported(format!("unknown digest algorithm {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestResult {
    /// Lowercase hex.
    pub hex: String,
    pub byte_length: usize,
}

impl DigestResult {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            hex: hex::encode(bytes),
            byte_length: bytes.len(),
        }
    }
}

fn hash_bytes<D: Digest>(input: &[u8]) -> Vec<u8> {
    D::digest(input).to_vec()
}

pub fn digest(algorithm: DigestAlgorithm, input: &[u8]) -> DigestResult {
    tracing::debug!(algorithm = algorithm.name(), len = input.len(), "digest");
    let bytes = match algorithm {
        DigestAlgorithm::Md5 => hash_bytes::<Md5>(input),
        DigestAlgorithm::Sha1 => hash_bytes::<Sha1>(input),
        DigestAlgorithm::Sha224 => hash_bytes::<Sha224>(input),
        DigestAlgorithm::Sha256 => hash_bytes::<Sha256>(input),
        DigestAlgorithm::Sha384 => hash_bytes::<Sha384>(input),
        DigestAlgorithm::Sha512 => hash_bytes::<Sha512>(input),
    };
    DigestResult::from_bytes(&bytes)
}

macro_rules! mac_with {
    ($hash:ty, $key:expr, $message:expr) => {{
        let mut mac = Hmac::<$hash>::new_from_slice($key)
            .map_err(|err| CryptoError::Unsupported(err.to_string()))?;
        mac.update($message);
        mac.finalize().into_bytes().to_vec()
    }};
}

/// Raw HMAC tag bytes.
pub(crate) fn mac_bytes(
    algorithm: DigestAlgorithm,
    key: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    Ok(match algorithm {
        DigestAlgorithm::Md5 => mac_with!(Md5, key, message),
        DigestAlgorithm::Sha1 => mac_with!(Sha1, key, message),
        DigestAlgorithm::Sha224 => mac_with!(Sha224, key, message),
        DigestAlgorithm::Sha256 => mac_with!(Sha256, key, message),
        DigestAlgorithm::Sha384 => mac_with!(Sha384, key, message),
        DigestAlgorithm::Sha512 => mac_with!(Sha512, key, message),
    })
}

pub fn hmac(algorithm: DigestAlgorithm, key: &[u8], message: &[u8]) -> Result<DigestResult, CryptoError> {
    tracing::debug!(algorithm = algorithm.name(), len = message.len(), "hmac");
    mac_bytes(algorithm, key, message).map(|bytes| DigestResult::from_bytes(&bytes))
}

/// Every digest of `input`, keyed by algorithm name.
pub fn hash_all(input: &[u8]) -> BTreeMap<String, String> {
    DigestAlgorithm::ALL
        .into_iter()
        .map(|alg| (alg.name().to_string(), digest(alg, input).hex))
        .collect()
}

/// Every HMAC of `message` under `key`, keyed by algorithm name.
pub fn hmac_all(key: &[u8], message: &[u8]) -> Result<BTreeMap<String, String>, CryptoError> {
    DigestAlgorithm::ALL
        .into_iter()
        .map(|alg| Ok((alg.name().to_string(), hmac(alg, key, message)?.hex)))
        .collect()
}

/// A digest or HMAC request. `algorithm` is a digest name (`SHA256`) or an
/// HMAC form (`HMAC-SHA256`), which requires `key`.
#[derive(Clone, PartialEq, Eq)]
pub struct DigestRequest {
    pub algorithm: String,
    pub input: Vec<u8>,
    pub key: Option<Vec<u8>>,
}

impl fmt::Debug for DigestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestRequest")
            .field("algorithm", &self.algorithm)
            .field("input_len", &self.input.len())
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub fn compute(request: &DigestRequest) -> Result<DigestResult, CryptoError> {
    let name = request.algorithm.trim();
    let hmac_name = name
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("hmac-"))
        .map(|_| &name[5..]);
    match hmac_name {
        Some(inner) => {
            let algorithm: DigestAlgorithm = inner.parse()?;
            let key = request
                .key
                .as_deref()
                .ok_or_else(|| CryptoError::Unsupported(format!("{name} needs a key")))?;
            hmac(algorithm, key, &request.input)
        }
        None => Ok(digest(name.parse()?, &request.input)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    Bits1024,
    Bits2048,
    Bits4096,
}

impl KeySize {
    pub fn bits(&self) -> usize {
        match self {
            Self::Bits1024 => 1024,
            Self::Bits2048 => 2048,
            Self::Bits4096 => 4096,
        }
    }
}

impl TryFrom<u32> for KeySize {
    type Error = CryptoError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            1024 => Ok(Self::Bits1024),
            2048 => Ok(Self::Bits2048),
            4096 => Ok(Self::Bits4096),
            other => Err(CryptoError::Unsupported(format!(
                "RSA key size {other} (expected 1024, 2048 or 4096)"
            ))),
        }
    }
}

/// PEM-encoded RSA key pair: SubjectPublicKeyInfo (`PUBLIC KEY`) and PKCS#8
/// (`PRIVATE KEY`).
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub public_key_pem: String,
    pub private_key_pem: String,
    pub size_bits: usize,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key_pem", &"<redacted>")
            .field("size_bits", &self.size_bits)
            .finish()
    }
}

/// Generates a fresh RSA key pair. This is CPU-bound (seconds for 4096 bits
/// in a browser); hosts should run it off their main thread.
pub fn generate_rsa_key_pair(size: KeySize) -> Result<KeyPair, CryptoError> {
    tracing::info!(bits = size.bits(), "generating RSA key pair");
    let mut rng = rand::rngs::OsRng;
    let private = RsaPrivateKey::new(&mut rng, size.bits())
        .map_err(|err| CryptoError::KeyGeneration(err.to_string()))?;
    let public = RsaPublicKey::from(&private);
    let private_der = private
        .to_pkcs8_der()
        .map_err(|err| CryptoError::KeyEncoding(err.to_string()))?;
    let public_der = public
        .to_public_key_der()
        .map_err(|err| CryptoError::KeyEncoding(err.to_string()))?;
    Ok(KeyPair {
        public_key_pem: pem_encode("PUBLIC KEY", public_der.as_bytes()),
        private_key_pem: pem_encode("PRIVATE KEY", private_der.as_bytes()),
        size_bits: size.bits(),
    })
}

/// Base64 body wrapped at 64 columns between BEGIN/END banners, with a
/// trailing newline.
pub fn pem_encode(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {label}-----\n");
    // base64 output is ASCII, so byte chunks are valid str slices
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}

/// Capability seam for hosts that bring their own primitives (e.g. a
/// platform keystore). [`RustCrypto`] is the default implementation.
pub trait CryptoProvider {
    fn digest(&self, algorithm: DigestAlgorithm, input: &[u8]) -> DigestResult;
    fn hmac(&self, algorithm: DigestAlgorithm, key: &[u8], message: &[u8]) -> Result<DigestResult, CryptoError>;
    fn generate_key_pair(&self, size: KeySize) -> Result<KeyPair, CryptoError>;
}

/// RustCrypto-backed provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCrypto;

impl CryptoProvider for RustCrypto {
    fn digest(&self, algorithm: DigestAlgorithm, input: &[u8]) -> DigestResult {
        digest(algorithm, input)
    }

    fn hmac(&self, algorithm: DigestAlgorithm, key: &[u8], message: &[u8]) -> Result<DigestResult, CryptoError> {
        hmac(algorithm, key, message)
    }

    fn generate_key_pair(&self, size: KeySize) -> Result<KeyPair, CryptoError> {
        generate_rsa_key_pair(size)
    }
}
