//! # lyceum-types: Shared vocabulary for the Lyceum platform
//!
//! Entity identifiers and lifecycle enums used across the authorization
//! stack (auth service, KYC service, school service, API gateway).
//!
//! Identifiers are newtypes over the string ids issued by the upstream
//! services; lifecycle enums are exhaustive so state handling can never
//! silently fall through.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Entity IDs
// ============================================================================

/// Unique identifier for a platform user.
///
/// Users are created by the auth service; the id is opaque to this crate
/// (typically a UUID, but nothing here depends on the format).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the id is empty.
    ///
    /// Empty ids are never issued by the platform; an empty id here means a
    /// value was constructed without going through an upstream service.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier for a school.
///
/// Schools are registered through the school service. A user may hold roles
/// in several schools at once; school-scoped role grants are keyed by this id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchoolId(String);

impl SchoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SchoolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SchoolId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Action
// ============================================================================

/// The verb of an access request: what the subject wants to do to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Create a new instance of the resource.
    Create,
    /// Read the resource.
    Read,
    /// Modify an existing instance.
    Update,
    /// Remove an instance.
    Delete,
    /// Full administrative control over the resource.
    Manage,
}

impl Action {
    /// Returns whether this action subsumes `other`.
    ///
    /// `Manage` implies every other action; all other actions imply only
    /// themselves.
    pub fn implies(self, other: Action) -> bool {
        self == other || self == Action::Manage
    }

    /// Returns the canonical wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Read => "READ",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
            Action::Manage => "MANAGE",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Account lifecycle
// ============================================================================

/// Lifecycle state of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Account is in good standing.
    Active,
    /// Account created but email/phone verification is outstanding.
    PendingVerification,
    /// Account temporarily disabled by an administrator.
    Suspended,
    /// Account permanently closed.
    Deactivated,
}

impl AccountStatus {
    /// Returns whether the account may authenticate at all.
    pub fn is_active(self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::PendingVerification
    }
}

// ============================================================================
// KYC lifecycle
// ============================================================================

/// State of a user's identity (KYC) verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    /// No verification has been started.
    Unverified,
    /// Documents submitted, review in progress.
    Pending,
    /// Identity verified by a KYC officer.
    Verified,
    /// Verification reviewed and rejected.
    Rejected,
    /// A previous verification has lapsed and must be renewed.
    Expired,
}

impl KycStatus {
    /// Returns whether the subject currently counts as identity-verified.
    pub fn is_verified(self) -> bool {
        matches!(self, KycStatus::Verified)
    }
}

impl Default for KycStatus {
    fn default() -> Self {
        Self::Unverified
    }
}

// ============================================================================
// Employment eligibility
// ============================================================================

/// State of a user's employment-eligibility verification.
///
/// Teachers and school staff must be employment-eligible before they can be
/// assigned to a school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    /// No eligibility check has been performed.
    Unknown,
    /// Eligibility check in progress.
    Pending,
    /// Cleared to work at platform schools.
    Eligible,
    /// Failed the eligibility check.
    Ineligible,
    /// A previous clearance has lapsed.
    Expired,
}

impl EmploymentStatus {
    /// Returns whether the subject is currently cleared to work.
    pub fn is_eligible(self) -> bool {
        matches!(self, EmploymentStatus::Eligible)
    }
}

impl Default for EmploymentStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

// ============================================================================
// Tests
// ============================================================================
