use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Raw entropy per token, before encoding.
pub const TOKEN_BYTES: usize = 32;

/// Opaque capability string bound to a download grant.
///
/// 32 bytes from the OS CSPRNG, hex-encoded to a fixed 64 characters.
/// Uniqueness is probabilistic; the store's unique token column is only a
/// defense-in-depth backstop, never consulted before generation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitlementToken(String);

impl EntitlementToken {
    /// Generate a fresh token from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token presented by a client (no validation beyond being text;
    /// lookups treat unknown tokens as invalid).
    pub fn from_presented(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// The token is the credential; keep it out of debug output and logs.
impl core::fmt::Debug for EntitlementToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("EntitlementToken(..)")
    }
}
