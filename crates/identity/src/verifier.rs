//! The credential-verification state machine.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::account::{hash_password, normalize_document, UserAccount};
use crate::contracts::ContractRegistry;
use crate::rate_limit::SlidingWindowLimiter;
use crate::session::{IssuedSession, SessionIssuer};
use crate::store::{IdentityError, UserStore};

/// One login form submission.
#[derive(Debug, Clone)]
pub struct LoginSubmission {
    pub document: String,
    pub password: String,
    pub remember: bool,
    pub source: IpAddr,
}

/// Why a submission was rejected. Each variant routes the user differently
/// in the presentation layer, so they stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NoAccount,
    WrongPassword,
    DocumentNotInContracts,
    /// Contract registry timed out or failed; the attempt never hangs.
    VerificationUnavailable,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::NoAccount => "no_account",
            RejectReason::WrongPassword => "wrong_password",
            RejectReason::DocumentNotInContracts => "document_not_in_contracts",
            RejectReason::VerificationUnavailable => "verification_unavailable",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::NoAccount => "no account exists for this document",
            RejectReason::WrongPassword => "the password is incorrect",
            RejectReason::DocumentNotInContracts => {
                "this document was not found in the contract registry"
            }
            RejectReason::VerificationUnavailable => {
                "contract verification is temporarily unavailable; try again later"
            }
        }
    }
}

/// Terminal state of one verification pass.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated {
        user: UserAccount,
        session: IssuedSession,
    },
    /// Account locked out; password correctness is irrelevant.
    Blocked,
    /// Active contract, no local account: redirect to self-registration.
    RegistrationRequired { document: String },
    /// Active contract and a local account: the placeholder path is
    /// exhausted, prompt for the real password.
    PasswordPrompt,
    RateLimited { retry_after_secs: u64 },
    Rejected(RejectReason),
}

/// Stateful login protocol over the user store, the contract registry, and
/// the endpoint rate limiter.
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
    contracts: Arc<dyn ContractRegistry>,
    limiter: SlidingWindowLimiter,
    sessions: SessionIssuer,
    lookup_timeout: Duration,
}

impl CredentialVerifier {
    pub fn new(
        users: Arc<dyn UserStore>,
        contracts: Arc<dyn ContractRegistry>,
        limiter: SlidingWindowLimiter,
        sessions: SessionIssuer,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            users,
            contracts,
            limiter,
            sessions,
            lookup_timeout,
        }
    }

    /// Runs one submission through the state machine.
    ///
    /// Expected outcomes (lockout, rejection, rate limiting) are values;
    /// only storage failures surface as errors.
    pub async fn verify(&self, submission: LoginSubmission) -> Result<LoginOutcome, IdentityError> {
        let document = normalize_document(&submission.document);

        if let Err(limited) = self.limiter.check(&document, submission.source) {
            return Ok(LoginOutcome::RateLimited {
                retry_after_secs: limited.retry_after_secs,
            });
        }

        // First-contact pattern: the document doubles as the password until
        // the user registers a real one.
        if document == normalize_document(&submission.password) {
            return self.verify_first_contact(&document).await;
        }

        let Some(user) = self.users.find_by_document(&document)? else {
            return Ok(LoginOutcome::Rejected(RejectReason::NoAccount));
        };

        if user.is_blocked() {
            return Ok(LoginOutcome::Blocked);
        }

        if !verify_password(&submission.password, &user.password_hash)? {
            let status = self.users.record_failed_attempt(&document, Utc::now())?;
            if status.locked {
                tracing::warn!(document = %document, "account locked after repeated failures");
                return Ok(LoginOutcome::Blocked);
            }
            return Ok(LoginOutcome::Rejected(RejectReason::WrongPassword));
        }

        self.users.clear_lockout(&document)?;
        let user = self
            .users
            .find_by_document(&document)?
            .ok_or(IdentityError::NotFound)?;

        let session = self
            .sessions
            .issue(&user, submission.remember, Utc::now())
            .map_err(|e| IdentityError::Storage(format!("session issue failed: {e}")))?;

        Ok(LoginOutcome::Authenticated { user, session })
    }

    async fn verify_first_contact(&self, document: &str) -> Result<LoginOutcome, IdentityError> {
        if let Err(reason) = self.lookup_contract(document).await {
            return Ok(LoginOutcome::Rejected(reason));
        }

        match self.users.find_by_document(document)? {
            None => Ok(LoginOutcome::RegistrationRequired {
                document: document.to_string(),
            }),
            Some(_) => Ok(LoginOutcome::PasswordPrompt),
        }
    }

    /// Registers a first-time user coming off the RegistrationRequired path.
    /// The contract is re-checked; registration is never taken on faith from
    /// an earlier login attempt.
    pub async fn register(
        &self,
        document: &str,
        password: &str,
        role_id: atrium_core::RoleId,
    ) -> Result<RegisterOutcome, IdentityError> {
        let document = normalize_document(document);

        if let Err(reason) = self.lookup_contract(&document).await {
            return Ok(RegisterOutcome::Rejected(reason));
        }

        let hash = hash_password(password)?;
        let account = UserAccount::new(&document, hash, role_id);
        match self.users.create(account.clone()) {
            Ok(()) => Ok(RegisterOutcome::Created(account)),
            Err(IdentityError::DuplicateDocument(_)) => Ok(RegisterOutcome::AlreadyRegistered),
            Err(e) => Err(e),
        }
    }

    /// Bounded contract check shared by the first-contact and registration
    /// paths. `Err` carries the rejection to surface to the caller.
    async fn lookup_contract(&self, document: &str) -> Result<(), RejectReason> {
        let lookup = tokio::time::timeout(
            self.lookup_timeout,
            self.contracts.active_contract(document),
        )
        .await;

        match lookup {
            Ok(Ok(Some(_))) => Ok(()),
            Ok(Ok(None)) => Err(RejectReason::DocumentNotInContracts),
            Ok(Err(e)) => {
                tracing::warn!(document = %document, error = %e, "contract lookup failed");
                Err(RejectReason::VerificationUnavailable)
            }
            Err(_) => {
                tracing::warn!(document = %document, "contract lookup timed out");
                Err(RejectReason::VerificationUnavailable)
            }
        }
    }
}

/// Terminal state of a self-registration attempt.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Created(UserAccount),
    AlreadyRegistered,
    Rejected(RejectReason),
}

fn verify_password(plain: &str, hash: &str) -> Result<bool, IdentityError> {
    bcrypt::verify(plain, hash)
        .map_err(|e| IdentityError::Storage(format!("password verification failed: {e}")))
}
