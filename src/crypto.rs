//! Low-level primitives shared by the cookie codec and the TOTP verifier.
//!
//! HMAC is provided for SHA-1, SHA-256 and SHA-512; the algorithm is picked
//! at call time by the caller (see [`crate::totp::Algo`]).

use base32::Alphabet;
use hmac::{Hmac, Mac};
use rand::distr::{Alphanumeric, SampleString};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// Computes HMAC-SHA-1. Used for cookie signing and SHA-1 TOTP codes.
pub fn hmac_sha1(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

/// Computes HMAC-SHA-256.
pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

/// Computes HMAC-SHA-512.
pub fn hmac_sha512(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercase hex, two nibbles per byte.
pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes lowercase or uppercase hex. `None` on odd length or a non-hex
/// digit.
pub fn hex_decode(s: &str) -> Option<Vec<u8>> {
    hex::decode(s).ok()
}

/// Pads a base32 string with `=` up to the next multiple of 8, as required
/// by RFC 4648 decoders. Already-padded input is returned unchanged.
pub fn b32pad(s: &str) -> String {
    let mut out = s.to_string();
    while !out.len().is_multiple_of(8) {
        out.push('=');
    }
    out
}

/// Decodes a base32 string (RFC 4648 alphabet). Padding is optional and the
/// input may be lowercase.
pub fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let padded = b32pad(&s.to_ascii_uppercase());
    base32::decode(Alphabet::Rfc4648 { padding: true }, &padded)
}

/// Random alphanumeric string from the thread-local CSPRNG.
pub fn random_string(n: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), n)
}
