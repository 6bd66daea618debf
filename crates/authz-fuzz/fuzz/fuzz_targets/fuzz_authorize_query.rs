#![no_main]

use authz_server::endpoints::AuthorizeRequest;
use authz_server::models::{CodeChallengeMethod, ScopeSet};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_urlencoded::from_bytes::<AuthorizeRequest>(data) else {
        return;
    };

    if let Some(scope) = request.scope.as_deref() {
        let scopes = ScopeSet::parse(scope);
        assert_eq!(ScopeSet::parse(&scopes.to_string()), scopes);
    }
    if let Some(method) = request.code_challenge_method.as_deref() {
        let _ = method.parse::<CodeChallengeMethod>();
    }
});
