#![no_main]

use authz_server::endpoints::{Grant, TokenRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parse arbitrary bytes as a token form, then as a grant
    if let Ok(request) = serde_urlencoded::from_bytes::<TokenRequest>(data) {
        let _ = Grant::from_request(&request);
    }
});
