//! Shared fixtures for unit tests. RSA key generation is slow, so each key is
//! generated once per test binary.

use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::pss::BlindedSigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::integrity::{max_pss_salt_len, TrustedKey};

pub const RSA_TEST_BITS: usize = 2048;

static RSA_KEY: Lazy<RsaPrivateKey> =
    Lazy::new(|| RsaPrivateKey::new(&mut OsRng, RSA_TEST_BITS).expect("rsa keygen"));

static OTHER_RSA_KEY: Lazy<RsaPrivateKey> =
    Lazy::new(|| RsaPrivateKey::new(&mut OsRng, RSA_TEST_BITS).expect("rsa keygen"));

pub fn rsa_key() -> &'static RsaPrivateKey {
    &RSA_KEY
}

pub fn other_rsa_key() -> &'static RsaPrivateKey {
    &OTHER_RSA_KEY
}

pub fn trusted_rsa(key: &RsaPrivateKey) -> TrustedKey {
    TrustedKey::rsa(key.to_public_key())
}

pub fn public_pem(key: &RsaPrivateKey) -> String {
    key.to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("pem encode")
}

/// RSASSA-PSS / SHA-256 with the maximum salt length.
pub fn sign_pss(key: &RsaPrivateKey, data: &[u8]) -> Vec<u8> {
    let salt_len = max_pss_salt_len(&key.to_public_key());
    let signer = BlindedSigningKey::<Sha256>::new_with_salt_len(key.clone(), salt_len);
    signer.sign_with_rng(&mut OsRng, data).to_bytes().to_vec()
}
