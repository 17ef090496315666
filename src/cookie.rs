//! Session cookie issuance and verification.
//!
//! The cookie is an integrity-protected, time-bounded bearer token of the
//! form `issue_time ":" hex(user) ":" hex(HMAC-SHA1(secret, prefix))` where
//! the MAC covers everything before the second colon.

use subtle::ConstantTimeEq;

use crate::config::HostConfig;
use crate::crypto::{hex_decode, hex_encode, hmac_sha1};

/// Cookie name shared between the proxy configuration and this service.
pub const COOKIE_NAME: &str = "authentication-token";

/// Builds a fresh signed cookie for `user` issued at `now`.
pub fn issue(user: &str, secret: &[u8], now: u64) -> String {
    let payload = format!("{}:{}", now, hex_encode(user.as_bytes()));
    let mac = hmac_sha1(secret, payload.as_bytes());
    format!("{}:{}", payload, hex_encode(&mac))
}

/// Checks a cookie against the host's users. Any malformed field denies.
pub fn verify(cookie: &str, host: &HostConfig, secret: &[u8], now: u64) -> bool {
    let Some(p1) = cookie.find(':') else {
        return false;
    };
    let Some(p2) = cookie[p1 + 1..].find(':').map(|p| p1 + 1 + p) else {
        return false;
    };

    // An unparsable issue time counts as 0 and fails the age check.
    let issued: u64 = cookie[..p1].parse().unwrap_or(0);

    let Some(user_bytes) = hex_decode(&cookie[p1 + 1..p2]) else {
        return false;
    };
    let Ok(user) = String::from_utf8(user_bytes) else {
        return false;
    };
    let Some(mac) = hex_decode(&cookie[p2 + 1..]) else {
        return false;
    };

    let Some(cred) = host.users.get(&user) else {
        return false;
    };
    if now > issued.saturating_add(cred.sduration) {
        return false;
    }

    let calc = hmac_sha1(secret, cookie[..p2].as_bytes());
    calc.ct_eq(&mac).into()
}
