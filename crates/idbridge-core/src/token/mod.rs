//! Token signing, verification, and key generation.
//!
//! - [`jwt`] - signing algorithms, key material, and the signer/verifier pair
//! - [`keygen`] - PEM key pair generation for RSA and EC algorithms

pub mod jwt;
pub mod keygen;

pub use jwt::{
    KeyFamily, KeyMaterial, SignedToken, SigningAlgorithm, SigningError, TokenSigner,
    TokenVerifier, VerificationError, VerifyingKey,
};
pub use keygen::{DEFAULT_RSA_BITS, GeneratedKeyPair, generate_ec_pem, generate_rsa_pem};
