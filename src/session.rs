use super::{config, crypto, models::User};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// HMAC-secured session string, signed by $SESSION_SECRET
///
/// Carries the notes service credential so that it can be handed to the
/// collection view explicitly on every request. Since this guy is stored in
/// a browser cookie, it's important to ensure it does not get too large.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub token: String,
    /// Unix seconds
    pub created_at: u64,
}

impl Session {
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > config::SESSION_MAX_AGE_SECS
    }
}

/// Unix seconds; a clock before the epoch reads as 0.
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn serialize_session(session: &Session, secret: &[u8]) -> String {
    let json_bytes = serde_json::to_string(&session)
        .expect("session can be JSON serialized");
    let b64 = general_purpose::STANDARD_NO_PAD.encode(json_bytes);
    let raw_digest = crypto::get_digest(secret, b64.as_bytes());
    let digest = general_purpose::STANDARD_NO_PAD.encode(raw_digest);
    let session = format!("{}:{}", b64, digest);

    session
}

pub fn deserialize_session(
    cookie: &str,
    secret: &[u8],
) -> Result<Session, &'static str> {
    let parts: Vec<&str> = cookie.split(':').collect();
    if parts.len() != 2 {
        Err("Invalid session")
    } else {
        let b64_json: Vec<u8> = parts[0].into();
        let digest: Vec<u8> =
            match general_purpose::STANDARD_NO_PAD.decode(parts[1]) {
                Ok(v) => v,
                Err(_) => {
                    return Err("Cannot base64 decode the digest");
                }
            };

        if crypto::is_valid(secret, &b64_json, &digest) {
            let json_string =
                match general_purpose::STANDARD_NO_PAD.decode(b64_json) {
                    Ok(v) => v,
                    Err(_) => {
                        return Err("Cannot base64 decode session string");
                    }
                };

            match serde_json::from_slice(&json_string) {
                Ok(v) => Ok(v),
                Err(_) => Err("Cannot deserialize session JSON"),
            }
        } else {
            Err("Failed to validate session signature")
        }
    }
}

/// `Set-Cookie` value for a signed session.
pub fn session_cookie(session: &Session, secret: &[u8]) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config::SESSION_COOKIE,
        serialize_session(session, secret),
        config::SESSION_MAX_AGE_SECS
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", config::SESSION_COOKIE)
}
