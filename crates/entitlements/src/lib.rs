//! `meshmart-entitlements` — download grants and capability tokens.
//!
//! A grant proves that a user may fetch a product until an expiry time. The
//! token alone authorizes redemption (bearer capability): it carries no user
//! identity, so unguessability is the entire security budget, 256 bits from
//! the OS CSPRNG.

pub mod gate;
pub mod grant;
pub mod issuer;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;
pub mod token;

pub use gate::{AccessGrant, DownloadGate, Redemption};
pub use grant::{DownloadGrant, NewGrant};
pub use issuer::{DEFAULT_GRANT_TTL_DAYS, EntitlementIssuer, FailedIssuance, IssuanceReport};
pub use store::{DownloadStore, RedeemOutcome};
pub use token::EntitlementToken;
