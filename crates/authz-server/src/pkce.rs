//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements S256 and plain code challenge verification per RFC 7636.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::crypto::constant_time_eq;
use crate::models::CodeChallengeMethod;

/// Minimum length of a code verifier or challenge (RFC 7636 §4.1).
pub const MIN_LEN: usize = 43;
/// Maximum length of a code verifier or challenge (RFC 7636 §4.1).
pub const MAX_LEN: usize = 128;

/// Verify a code verifier against a stored challenge and method name.
///
/// Unknown methods never verify.
#[must_use]
pub fn verify(code_verifier: &str, code_challenge: &str, method: &str) -> bool {
    method
        .parse::<CodeChallengeMethod>()
        .is_ok_and(|method| verify_with(code_verifier, code_challenge, method))
}

/// Verify a code verifier against a stored challenge.
#[must_use]
pub fn verify_with(code_verifier: &str, code_challenge: &str, method: CodeChallengeMethod) -> bool {
    match method {
        CodeChallengeMethod::S256 => {
            constant_time_eq(s256_challenge(code_verifier).as_bytes(), code_challenge.as_bytes())
        }
        CodeChallengeMethod::Plain => {
            constant_time_eq(code_verifier.as_bytes(), code_challenge.as_bytes())
        }
    }
}

/// Compute `BASE64URL(SHA256(code_verifier))`.
#[must_use]
pub fn s256_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// Returns true if `value` is 43-128 characters of
/// `ALPHA / DIGIT / "-" / "." / "_" / "~"`.
#[must_use]
pub fn is_well_formed(value: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}
