//! Fuzzing library for authz-server.
//!
//! Targets cover the untrusted inputs of the protocol endpoints: token and
//! authorization request parameters, and PKCE verification.
//!
//! # Usage
//!
//! ```bash
//! cd crates/authz-fuzz
//! cargo +nightly fuzz run fuzz_token_form -- -max_total_time=60
//! ```

pub use authz_server::endpoints;
pub use authz_server::pkce;
