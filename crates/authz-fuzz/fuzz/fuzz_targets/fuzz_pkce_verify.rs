#![no_main]

use authz_server::pkce;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Split into verifier and challenge at the first newline
    let (verifier, challenge) = text.split_once('\n').unwrap_or((text, ""));
    for method in ["S256", "plain", "unknown"] {
        let _ = pkce::verify(verifier, challenge, method);
    }
    assert!(pkce::verify(verifier, &pkce::s256_challenge(verifier), "S256"));
});
