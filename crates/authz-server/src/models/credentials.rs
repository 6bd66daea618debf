//! Authorization codes, access tokens and refresh tokens.
//!
//! Records are keyed by their opaque value in the credential store, so the
//! value itself is not repeated inside the record.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use super::scope::ScopeSet;

/// Anything with an absolute expiry instant.
pub trait Expiring {
    /// Instant after which the record is no longer valid.
    fn expires_at(&self) -> Instant;

    /// Check expiry against a given instant.
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }

    /// Check if the record has expired.
    fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// PKCE transformation applied to the code verifier (RFC 7636 §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChallengeMethod {
    /// `BASE64URL(SHA256(verifier))`
    S256,
    /// challenge equals verifier
    Plain,
}

impl CodeChallengeMethod {
    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl FromStr for CodeChallengeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(format!("unsupported code_challenge_method '{other}'")),
        }
    }
}

impl fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A PKCE challenge bound to an authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub challenge: String,
    pub method: CodeChallengeMethod,
}

/// An authorization code issued after the resource owner approved a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scopes: ScopeSet,
    pub expires_at: Instant,
    pub pkce: Option<PkceChallenge>,
}

/// A bearer access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub client_id: String,
    pub user_id: String,
    pub scopes: ScopeSet,
    pub expires_at: Instant,
}

/// A refresh token for obtaining a new token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub client_id: String,
    pub user_id: String,
    pub scopes: ScopeSet,
    pub expires_at: Instant,
    /// The access token issued together with this refresh token.
    pub access_token: String,
}

impl Expiring for AuthorizationCode {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

impl Expiring for AccessToken {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

impl Expiring for RefreshToken {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

/// Which token namespace an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Parse an RFC 7009 `token_type_hint`. Unknown hints are ignored.
    #[must_use]
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "access_token" => Some(Self::Access),
            "refresh_token" => Some(Self::Refresh),
            _ => None,
        }
    }

    /// The other namespace.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Access => Self::Refresh,
            Self::Refresh => Self::Access,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_challenge_method_parse() {
        assert_eq!("S256".parse::<CodeChallengeMethod>(), Ok(CodeChallengeMethod::S256));
        assert_eq!("plain".parse::<CodeChallengeMethod>(), Ok(CodeChallengeMethod::Plain));
        assert!("s256".parse::<CodeChallengeMethod>().is_err());
        assert!("".parse::<CodeChallengeMethod>().is_err());
        assert_eq!(CodeChallengeMethod::Plain.to_string(), "plain");
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Instant::now();
        let token = AccessToken {
            client_id: "c1".into(),
            user_id: "u1".into(),
            scopes: ScopeSet::default(),
            expires_at: now + Duration::from_secs(60),
        };
        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::from_secs(60)));
        assert!(token.is_expired_at(now + Duration::from_secs(61)));
    }

    #[test]
    fn test_token_kind_hint() {
        assert_eq!(TokenKind::from_hint("refresh_token"), Some(TokenKind::Refresh));
        assert_eq!(TokenKind::from_hint("access_token"), Some(TokenKind::Access));
        assert_eq!(TokenKind::from_hint("id_token"), None);
        assert_eq!(TokenKind::Access.other(), TokenKind::Refresh);
    }
}
