use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Current session credentials, shared by the client and its refresher
#[derive(Debug, Default)]
pub struct TokenStore {
    inner: RwLock<Option<TokenPair>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            inner: RwLock::new(Some(pair)),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|p| p.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|p| p.refresh_token.clone())
    }

    pub fn set(&self, pair: TokenPair) {
        *self.inner.write() = Some(pair);
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_some()
    }
}
