//! `atrium-identity` — credential verification for the portal.
//!
//! Implements the stateful login protocol: the first-contact
//! document-as-password path gated by the external contract registry, the
//! failed-attempt counter with automatic lockout, the endpoint-level rate
//! limiter, and HS256 session tokens.

pub mod account;
pub mod contracts;
pub mod rate_limit;
pub mod session;
pub mod store;
pub mod verifier;

pub use account::{hash_password, normalize_document, UserAccount, MAX_FAILED_ATTEMPTS};
pub use contracts::{Contract, ContractLookupError, ContractRegistry, FixedContractRegistry};
pub use rate_limit::{RateLimited, SlidingWindowLimiter};
pub use session::{Hs256TokenValidator, IssuedSession, SessionClaims, SessionError, SessionIssuer, TokenValidator};
pub use store::{IdentityError, InMemoryUserStore, LockoutStatus, UserStore};
pub use verifier::{CredentialVerifier, LoginOutcome, LoginSubmission, RegisterOutcome, RejectReason};
