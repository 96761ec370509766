// API tokens - Request tokens win over the configured default; never logged in full

use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// None for empty or whitespace-only input
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(ApiToken(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix that identifies a token in logs
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(&hasher.finalize()[..4])
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiToken({})", self.fingerprint())
    }
}

pub fn resolve_token(request: Option<&str>, default: Option<&str>) -> Option<ApiToken> {
    request.and_then(ApiToken::new).or_else(|| default.and_then(ApiToken::new))
}
