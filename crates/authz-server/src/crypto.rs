//! Opaque credential generation and constant-time comparison.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

use crate::error::EntropyError;

/// Authorization code entropy: 128 bits.
pub const CODE_BYTES: usize = 16;
/// Access token entropy: 256 bits.
pub const ACCESS_TOKEN_BYTES: usize = 32;
/// Refresh token entropy: 256 bits.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate an opaque identifier from `bytes` bytes of OS randomness.
///
/// The full buffer is base64url encoded without padding, so the visible
/// string carries all of the generated entropy (16 bytes -> 22 chars,
/// 32 bytes -> 43 chars).
pub fn generate_opaque(bytes: usize) -> Result<String, EntropyError> {
    let mut buf = vec![0u8; bytes];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut buf).map_err(|e| EntropyError(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&buf))
}

/// Generate an authorization code.
pub fn generate_code() -> Result<String, EntropyError> {
    generate_opaque(CODE_BYTES)
}

/// Generate an access token.
pub fn generate_access_token() -> Result<String, EntropyError> {
    generate_opaque(ACCESS_TOKEN_BYTES)
}

/// Generate a refresh token.
pub fn generate_refresh_token() -> Result<String, EntropyError> {
    generate_opaque(REFRESH_TOKEN_BYTES)
}

/// Compare two byte strings in time independent of where they differ.
///
/// Only the length may leak; secrets and challenges are not length-secret.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
