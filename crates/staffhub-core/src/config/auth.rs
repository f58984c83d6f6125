//! Handshake credential verification configuration.

use serde::{Deserialize, Serialize};

/// JWT verification settings for the connection handshake.
///
/// Token *issuance* belongs to the login service; this process only
/// verifies signatures on credentials presented at the WebSocket
/// handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC secret for verifying handshake tokens.
    pub jwt_secret: String,
    /// Expected token issuer.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Allowed clock skew in seconds when checking expiry.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

fn default_issuer() -> String {
    "staffhub".to_string()
}

fn default_leeway() -> u64 {
    30
}
