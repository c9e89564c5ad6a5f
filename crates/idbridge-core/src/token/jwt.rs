//! JWT signing and verification.
//!
//! A [`TokenSigner`] binds one [`SigningAlgorithm`] to matching
//! [`KeyMaterial`] and mints compact tokens from any serializable claim set.
//! Its [`TokenVerifier`] counterpart checks the signature and expiry on the
//! way back in. RSA and EC signers derive the public key PEM at
//! construction; HMAC signers have no public key to publish.

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use serde::Serialize;
use serde::de::DeserializeOwned;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while building a signer or minting a token.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The algorithm name is not in the supported set.
    #[error("Unsupported signing algorithm: {name}")]
    UnsupportedAlgorithm {
        /// The algorithm name as given.
        name: String,
    },

    /// The key material does not fit the algorithm's key family.
    #[error("{algorithm} requires {expected} key material, got {actual}")]
    KeyMismatch {
        algorithm: SigningAlgorithm,
        expected: KeyFamily,
        actual: KeyFamily,
    },

    /// The key could not be parsed.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// Producing the signature failed.
    #[error("Failed to sign token: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// Generating a fresh key pair failed.
    #[error("Key generation error: {message}")]
    KeyGeneration {
        /// Description of the key generation failure.
        message: String,
    },
}

impl SigningError {
    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(name: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { name: name.into() }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGeneration` error.
    #[must_use]
    pub fn key_generation(message: impl Into<String>) -> Self {
        Self::KeyGeneration {
            message: message.into(),
        }
    }

    /// Returns `true` if the error points at the configured key or algorithm
    /// rather than a runtime failure.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedAlgorithm { .. } | Self::KeyMismatch { .. } | Self::InvalidKey { .. }
        )
    }
}

/// Errors raised while verifying a presented token.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token is not a parseable JWT.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// The token parsed but its claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// The verification key is unusable.
    #[error("Invalid verification key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl VerificationError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::malformed(err.to_string()),
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Key family an algorithm draws its material from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// RSA private/public key pair.
    Rsa,
    /// Elliptic-curve private/public key pair.
    Ec,
    /// Shared symmetric secret.
    Hmac,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rsa => "RSA",
            Self::Ec => "EC",
            Self::Hmac => "HMAC",
        };
        write!(f, "{name}")
    }
}

/// Supported signing algorithms for minted tokens.
///
/// `ES512` is absent: the signing backend has no P-521 support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256.
    RS256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    RS384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    RS512,
    /// ECDSA on P-256 with SHA-256.
    ES256,
    /// ECDSA on P-384 with SHA-384.
    ES384,
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
            Self::ES256 => Algorithm::ES256,
            Self::ES384 => Algorithm::ES384,
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }

    /// Returns the key family this algorithm signs with.
    #[must_use]
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::ES256 | Self::ES384 => KeyFamily::Ec,
            Self::HS256 | Self::HS384 | Self::HS512 => KeyFamily::Hmac,
        }
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        self.family() == KeyFamily::Rsa
    }

    /// Returns `true` if this is an EC-based algorithm.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        self.family() == KeyFamily::Ec
    }

    /// Returns `true` if this is an HMAC-based algorithm.
    #[must_use]
    pub fn is_hmac(&self) -> bool {
        self.family() == KeyFamily::Hmac
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(SigningError::unsupported_algorithm(other)),
        }
    }
}

// ============================================================================
// Key Material
// ============================================================================

/// Private key material handed to a [`TokenSigner`].
///
/// Deliberately has no `Debug` impl so secrets cannot leak through logging.
pub enum KeyMaterial {
    /// PEM-encoded RSA private key (PKCS#8 or PKCS#1).
    RsaPem(String),
    /// PEM-encoded EC private key (PKCS#8 or SEC1).
    EcPem(String),
    /// Raw shared secret for HMAC algorithms.
    Secret(Vec<u8>),
}

impl KeyMaterial {
    /// Returns the key family this material belongs to.
    #[must_use]
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::RsaPem(_) => KeyFamily::Rsa,
            Self::EcPem(_) => KeyFamily::Ec,
            Self::Secret(_) => KeyFamily::Hmac,
        }
    }
}

/// Key material a [`TokenVerifier`] checks signatures with.
#[derive(Clone)]
pub enum VerifyingKey {
    /// PEM-encoded public key (RSA or EC, SPKI format).
    PublicPem(String),
    /// Raw shared secret for HMAC algorithms.
    Secret(Vec<u8>),
}

/// A compact-encoded signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    /// The compact `header.payload.signature` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the compact string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Token Signer
// ============================================================================

/// Signs claim sets into compact tokens with a fixed algorithm and key.
///
/// Thread-safe (`Send + Sync`); build one at startup and share it.
pub struct TokenSigner {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    verifying_key: VerifyingKey,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material is deliberately omitted so secrets cannot leak.
        f.debug_struct("TokenSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Creates a signer from an algorithm and matching key material.
    ///
    /// The key is parsed eagerly, and for RSA/EC the public half is derived
    /// here, so a misconfigured key fails at startup rather than on the
    /// first login.
    ///
    /// # Errors
    /// Returns `KeyMismatch` when the material is from the wrong family and
    /// `InvalidKey` when it cannot be parsed.
    pub fn new(algorithm: SigningAlgorithm, material: KeyMaterial) -> Result<Self, SigningError> {
        let actual = material.family();
        if algorithm.family() != actual {
            return Err(SigningError::KeyMismatch {
                algorithm,
                expected: algorithm.family(),
                actual,
            });
        }

        let (encoding_key, verifying_key) = match material {
            KeyMaterial::RsaPem(pem) => {
                let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| SigningError::invalid_key(e.to_string()))?;
                let public_pem = rsa_public_pem(&pem)?;
                (encoding_key, VerifyingKey::PublicPem(public_pem))
            }
            KeyMaterial::EcPem(pem) => {
                let encoding_key = EncodingKey::from_ec_pem(pem.as_bytes())
                    .map_err(|e| SigningError::invalid_key(e.to_string()))?;
                let public_pem = ec_public_pem(&pem, algorithm)?;
                (encoding_key, VerifyingKey::PublicPem(public_pem))
            }
            KeyMaterial::Secret(bytes) => {
                let encoding_key = EncodingKey::from_secret(&bytes);
                (encoding_key, VerifyingKey::Secret(bytes))
            }
        };

        Ok(Self {
            algorithm,
            encoding_key,
            verifying_key,
        })
    }

    /// Returns the configured signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Signs `claims` into a compact token.
    ///
    /// # Errors
    /// Returns an error if serialization or signing fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<SignedToken, SigningError> {
        let header = Header::new(self.algorithm.to_jwt_algorithm());

        encode(&header, claims, &self.encoding_key)
            .map(SignedToken)
            .map_err(|e| SigningError::signing(e.to_string()))
    }

    /// PEM-encoded public keys suitable for publication.
    ///
    /// Empty for HMAC signers, whose secret must never leave the process.
    #[must_use]
    pub fn public_key_pems(&self) -> Vec<String> {
        match &self.verifying_key {
            VerifyingKey::PublicPem(pem) => vec![pem.clone()],
            VerifyingKey::Secret(_) => Vec::new(),
        }
    }

    /// Builds the verifier that matches this signer's algorithm and key.
    ///
    /// # Errors
    /// Returns an error if the verification key cannot be parsed.
    pub fn verifier(&self) -> Result<TokenVerifier, SigningError> {
        TokenVerifier::new(self.algorithm, &self.verifying_key)
    }
}

// ============================================================================
// Token Verifier
// ============================================================================

/// Verifies compact tokens against a fixed algorithm and key.
#[derive(Debug)]
pub struct TokenVerifier {
    algorithm: SigningAlgorithm,
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    /// Creates a verifier from an algorithm and the matching verification
    /// key: a public key PEM for RSA/EC, the shared secret for HMAC.
    ///
    /// # Errors
    /// Returns an error if the key kind does not fit the algorithm or the
    /// PEM cannot be parsed.
    pub fn new(algorithm: SigningAlgorithm, key: &VerifyingKey) -> Result<Self, SigningError> {
        let decoding_key = match (algorithm.family(), key) {
            (KeyFamily::Rsa, VerifyingKey::PublicPem(pem)) => {
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| SigningError::invalid_key(e.to_string()))?
            }
            (KeyFamily::Ec, VerifyingKey::PublicPem(pem)) => {
                DecodingKey::from_ec_pem(pem.as_bytes())
                    .map_err(|e| SigningError::invalid_key(e.to_string()))?
            }
            (KeyFamily::Hmac, VerifyingKey::Secret(secret)) => DecodingKey::from_secret(secret),
            (KeyFamily::Hmac, VerifyingKey::PublicPem(_)) => {
                return Err(SigningError::invalid_key(
                    "HMAC verification takes the shared secret, not a public key PEM",
                ));
            }
            (_, VerifyingKey::Secret(_)) => {
                return Err(SigningError::invalid_key(format!(
                    "{algorithm} verification takes a public key PEM, not a shared secret"
                )));
            }
        };

        Ok(Self {
            algorithm,
            decoding_key,
        })
    }

    /// Decodes and validates a compact token, returning its claims.
    ///
    /// Checks the signature and expiry; audience and issuer checks are left
    /// to the caller.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, the signature does not
    /// match, or the token has expired.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, VerificationError> {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        validation.validate_exp = true;
        validation.validate_aud = false; // Audience validated at application layer

        let data = decode::<T>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

// ============================================================================
// Key Parsing
// ============================================================================

fn rsa_public_pem(private_pem: &str) -> Result<String, SigningError> {
    let private_key = match RsaPrivateKey::from_pkcs8_pem(private_pem) {
        Ok(key) => key,
        Err(_) => RsaPrivateKey::from_pkcs1_pem(private_pem)
            .map_err(|e| SigningError::invalid_key(e.to_string()))?,
    };

    private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| SigningError::invalid_key(e.to_string()))
}

fn ec_public_pem(private_pem: &str, algorithm: SigningAlgorithm) -> Result<String, SigningError> {
    match algorithm {
        SigningAlgorithm::ES256 => {
            let secret_key = match p256::SecretKey::from_pkcs8_pem(private_pem) {
                Ok(key) => key,
                Err(_) => p256::SecretKey::from_sec1_pem(private_pem)
                    .map_err(|e| SigningError::invalid_key(e.to_string()))?,
            };
            secret_key
                .public_key()
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| SigningError::invalid_key(e.to_string()))
        }
        SigningAlgorithm::ES384 => {
            let secret_key = match p384::SecretKey::from_pkcs8_pem(private_pem) {
                Ok(key) => key,
                Err(_) => p384::SecretKey::from_sec1_pem(private_pem)
                    .map_err(|e| SigningError::invalid_key(e.to_string()))?,
            };
            secret_key
                .public_key()
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| SigningError::invalid_key(e.to_string()))
        }
        other => Err(SigningError::invalid_key(format!(
            "{other} does not use EC key material"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
