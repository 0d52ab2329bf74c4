//! Single-flight credential refresh for authenticated clients
//!
//! Many in-flight requests can discover an expired access token at once.
//! This library makes sure only one of them refreshes it:
//! - **RefreshGate**: Idle/Refreshing state machine; one leader refreshes,
//!   everyone else waits on a one-shot handle and replays in arrival order
//! - **call_with_refresh**: per-call retry flag; a call is replayed at most once
//! - **ApiClient**: reqwest-based JSON client that maps HTTP 401 onto the gate
//!
//! # Example
//!
//! ```rust,no_run
//! use refresh_gate::{ApiClient, FnReauthenticator, RefreshGateConfig, TokenPair, TokenStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tokens = Arc::new(TokenStore::with_tokens(TokenPair {
//!         access_token: "access".to_string(),
//!         refresh_token: "refresh".to_string(),
//!     }));
//!     let client = ApiClient::new(
//!         "https://api.example.com",
//!         "/auth/refresh",
//!         tokens,
//!         RefreshGateConfig::default(),
//!         Arc::new(FnReauthenticator(|reason: &refresh_gate::RefreshError| {
//!             eprintln!("please sign in again: {reason}");
//!         })),
//!     );
//!
//!     let profile: serde_json::Value = client.get_json("/me").await.unwrap();
//!     println!("{profile}");
//! }
//! ```

pub mod call;
pub mod client;
pub mod error;
pub mod gate;
pub mod token;

// Re-export main types for convenience
pub use call::call_with_refresh;
pub use client::{ApiClient, HttpTokenRefresher, SessionReset};
pub use error::{CallError, RefreshError, Result};
pub use gate::{
    FnReauthenticator, GatePhase, Reauthenticator, RefreshGate, RefreshGateConfig, ReplayTurn,
    TokenRefresher,
};
pub use token::{TokenPair, TokenStore};
