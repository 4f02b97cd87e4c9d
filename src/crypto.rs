use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub fn get_digest(secret: &[u8], val: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("hmac accepts keys of any size");
    mac.update(val);

    mac.finalize().into_bytes().to_vec()
}

pub fn is_valid(secret: &[u8], val: &[u8], digest: &[u8]) -> bool {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("hmac accepts keys of any size");
    mac.update(val);

    mac.verify_slice(digest).is_ok()
}

/// Plain SHA-256, used by the in-memory backend so it never holds raw
/// passwords.
pub fn hash_password(password: &str) -> Vec<u8> {
    Sha256::digest(password.as_bytes()).to_vec()
}
