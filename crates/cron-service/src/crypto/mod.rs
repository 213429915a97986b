//! Cryptographic operations: the API-token credential store and HS256
//! signing of API tokens.
//!
//! # Credential store
//!
//! [`TokenCipher`] encrypts signed API tokens at rest with AES-256-GCM.
//! Encryption is deterministic: the 96-bit nonce is the first 12 bytes of
//! HMAC-SHA256(key, plaintext). The same token always yields the same
//! ciphertext; stored ciphertexts are compared for duplicate detection and
//! looked up directly on authentication.
//!
//! Wire format: base64url (no padding) of `nonce || ciphertext || tag`.

use crate::errors::CronError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::jwt::{AppClaims, MAX_API_TOKEN_SIZE_BYTES};
use common::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::{
    aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN},
    hmac,
};
use std::fmt;
use tracing::instrument;

/// AES-256 key length in bytes.
const KEY_LEN: usize = 32;

/// AES-GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Deterministic AES-256-GCM cipher for API tokens.
pub struct TokenCipher {
    key: SecretBox<Vec<u8>>,
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenCipher {
    /// Create a cipher from a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, CronError> {
        if key.len() != KEY_LEN {
            return Err(CronError::Crypto(format!(
                "Invalid encryption key length: {} (expected {})",
                key.len(),
                KEY_LEN
            )));
        }

        Ok(Self {
            key: SecretBox::new(Box::new(key.to_vec())),
        })
    }

    fn aead_key(&self) -> Result<LessSafeKey, CronError> {
        let unbound = UnboundKey::new(&AES_256_GCM, self.key.expose_secret())
            .map_err(|e| CronError::Crypto(format!("Cipher key creation failed: {}", e)))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Nonce derived from HMAC-SHA256(key, plaintext).
    fn derive_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_LEN], CronError> {
        let mac_key = hmac::Key::new(hmac::HMAC_SHA256, self.key.expose_secret());
        let tag = hmac::sign(&mac_key, plaintext);

        tag.as_ref()
            .get(..NONCE_LEN)
            .and_then(|bytes| <[u8; NONCE_LEN]>::try_from(bytes).ok())
            .ok_or_else(|| CronError::Crypto("Nonce derivation failed".to_string()))
    }

    /// Encrypt `plaintext`, returning the encoded ciphertext.
    #[instrument(skip_all)]
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CronError> {
        let nonce_bytes = self.derive_nonce(plaintext.as_bytes())?;
        let sealing_key = self.aead_key()?;

        let mut in_out = plaintext.as_bytes().to_vec();
        sealing_key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|e| CronError::Crypto(format!("Encryption operation failed: {}", e)))?;

        let mut encoded = Vec::with_capacity(NONCE_LEN + in_out.len());
        encoded.extend_from_slice(&nonce_bytes);
        encoded.extend_from_slice(&in_out);

        Ok(URL_SAFE_NO_PAD.encode(encoded))
    }

    /// Decrypt an encoded ciphertext produced by [`TokenCipher::encrypt`].
    #[instrument(skip_all)]
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CronError> {
        let raw = URL_SAFE_NO_PAD
            .decode(ciphertext.trim())
            .map_err(|e| CronError::Crypto(format!("Invalid ciphertext encoding: {}", e)))?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CronError::Crypto(format!(
                "Ciphertext too short: {} bytes",
                raw.len()
            )));
        }

        let (nonce_part, sealed) = raw.split_at(NONCE_LEN);
        let nonce_bytes: [u8; NONCE_LEN] = nonce_part
            .try_into()
            .map_err(|e| CronError::Crypto(format!("Invalid nonce format: {}", e)))?;

        let opening_key = self.aead_key()?;
        let mut in_out = sealed.to_vec();
        let decrypted = opening_key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|e| CronError::Crypto(format!("Decryption operation failed: {}", e)))?;

        String::from_utf8(decrypted.to_vec())
            .map_err(|e| CronError::Crypto(format!("Decrypted token is not UTF-8: {}", e)))
    }
}

/// Sign API token claims with HS256.
#[instrument(skip_all)]
pub fn sign_app_token(claims: &AppClaims, secret: &[u8]) -> Result<String, CronError> {
    let header = Header::new(Algorithm::HS256);

    encode(&header, claims, &EncodingKey::from_secret(secret))
        .map_err(|e| CronError::Crypto(format!("JWT signing operation failed: {}", e)))
}

/// Verify an HS256 API token.
///
/// Validates:
/// - Token size (must be <= `MAX_API_TOKEN_SIZE_BYTES`)
/// - Signature
/// - Issuer and audience
/// - Expiration, only when the token carries `exp`
#[instrument(skip_all)]
pub fn verify_app_token(
    token: &str,
    secret: &[u8],
    issuer: &str,
    audience: &str,
) -> Result<AppClaims, CronError> {
    if token.len() > MAX_API_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "cron.crypto",
            token_size = token.len(),
            max_size = MAX_API_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(CronError::Unauthorized("The api token is invalid".to_string()));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["iss", "aud"]);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.validate_exp = true;

    let token_data = decode::<AppClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| {
            tracing::debug!(target: "cron.crypto", error = %e, "Token verification failed");
            CronError::Unauthorized("The api token is invalid".to_string())
        })?;

    Ok(token_data.claims)
}
