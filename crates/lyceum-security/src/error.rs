//! Security error types.
//!
//! The taxonomy distinguishes authentication failures (401, never reach the
//! ABAC evaluators), policy denials (403, a routine outcome carrying the
//! evaluator's reason), and internal faults (500, deny-by-default). The
//! middleware attaches context; converting an error into an HTTP response
//! is the terminal handler's job.

use lyceum_abac::EvaluationError;
use lyceum_types::Action;
use thiserror::Error;

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Broad classification of a security error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityErrorKind {
    /// Authentication failure: missing, invalid, or expired credentials.
    Auth,
    /// Policy denial: the subject is authenticated but not permitted.
    Policy,
    /// Internal fault: the decision could not be computed.
    Internal,
}

/// Errors surfaced by the security pipeline.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// No bearer token on a route that requires authentication.
    #[error("missing bearer token")]
    MissingToken,

    /// The bearer token failed verification.
    #[error("invalid token: {detail}")]
    InvalidToken { detail: String },

    /// The bearer token has expired.
    #[error("token expired")]
    ExpiredToken,

    /// The token's coarse role/permission claims do not satisfy the
    /// route's basic-auth configuration.
    #[error("insufficient credentials: {detail}")]
    CredentialsRejected { detail: String },

    /// The ABAC evaluation denied access.
    #[error("access to {resource} ({action}) denied: {reason}")]
    Forbidden {
        reason: String,
        resource: String,
        action: Action,
    },

    /// The evaluation itself failed (unknown or broken predicate).
    /// Deny-by-default: this never results in a grant.
    #[error("policy evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Any other internal fault while computing the decision.
    #[error("security internal error: {detail}")]
    Internal { detail: String },
}

impl SecurityError {
    /// Returns the broad classification of this error.
    pub fn kind(&self) -> SecurityErrorKind {
        match self {
            SecurityError::MissingToken
            | SecurityError::InvalidToken { .. }
            | SecurityError::ExpiredToken => SecurityErrorKind::Auth,
            SecurityError::CredentialsRejected { .. } | SecurityError::Forbidden { .. } => {
                SecurityErrorKind::Policy
            }
            SecurityError::Evaluation(_) | SecurityError::Internal { .. } => {
                SecurityErrorKind::Internal
            }
        }
    }

    /// Returns the HTTP status code a terminal handler should map this to.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            SecurityErrorKind::Auth => 401,
            SecurityErrorKind::Policy => 403,
            SecurityErrorKind::Internal => 500,
        }
    }

    /// Returns a stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            SecurityError::MissingToken => "AUTH_MISSING_TOKEN",
            SecurityError::InvalidToken { .. } => "AUTH_INVALID_TOKEN",
            SecurityError::ExpiredToken => "AUTH_EXPIRED_TOKEN",
            SecurityError::CredentialsRejected { .. } => "POLICY_INSUFFICIENT_CREDENTIALS",
            SecurityError::Forbidden { .. } => "POLICY_ACCESS_DENIED",
            SecurityError::Evaluation(_) => "POLICY_EVALUATION_FAILED",
            SecurityError::Internal { .. } => "SECURITY_INTERNAL",
        }
    }
}
