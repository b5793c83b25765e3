//! Sealing Actions secrets for the REST API.
//!
//! GitHub expects secret values encrypted with a libsodium sealed box against the
//! repository, environment or organization public key, then base64-encoded.

use anyhow::{Context, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use crypto_box::{PublicKey, aead::OsRng};

/// Seals `plaintext` for the base64-encoded Curve25519 `public_key`.
pub fn seal_secret(public_key: &str, plaintext: &str) -> anyhow::Result<String> {
    let key_bytes = STANDARD
        .decode(public_key)
        .context("Failed to decode the Actions public key")?;

    let Ok(key_bytes): Result<[u8; 32], _> = key_bytes.try_into() else {
        bail!("Actions public key must be 32 bytes");
    };

    let sealed = PublicKey::from(key_bytes)
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to encrypt secret: {e}"))?;

    Ok(STANDARD.encode(sealed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_box::SecretKey;

    #[test]
    fn sealed_value_opens_with_the_matching_key() {
        let secret_key = SecretKey::generate(&mut OsRng);
        let public_key = STANDARD.encode(secret_key.public_key().as_bytes());

        let sealed = seal_secret(&public_key, "hunter2").unwrap();
        let opened = secret_key.unseal(&STANDARD.decode(sealed).unwrap()).unwrap();

        assert_eq!(opened, b"hunter2");
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(seal_secret("not base64!", "x").is_err());
        assert!(seal_secret(&STANDARD.encode([0u8; 16]), "x").is_err());
    }
}
