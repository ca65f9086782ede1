//! # lyceum-abac: Attribute-Based Access Control
//!
//! The authorization core consulted by every protected request on the
//! Lyceum platform. Given a *subject* (a user with roles, verification
//! state, and per-school context), a *policy* (resource, action,
//! conditions), and a request context, it returns a single grant/deny
//! decision with a human-readable reason.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Access Request                              │
//! │  (UserAttributes + AccessPolicy + Context)   │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision Cache                              │
//! │  (TTL + capacity bounded, keyed by           │
//! │   subject|resource|action|conditions)        │
//! └─────────────────┬───────────────────────────┘
//!                   │ miss
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Evaluator (fail-fast, fixed order)          │
//! │  1. Roles (exact or hierarchical)            │
//! │  2. Verification (KYC / employment)          │
//! │  3. School context                           │
//! │  4. Environment (IP / time / device / geo)   │
//! │  5. Custom predicates (named registry)       │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  ValidationResult                            │
//! │  - granted: bool                             │
//! │  - reason: first failing condition group     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use lyceum_abac::attributes::KycProfile;
//! use lyceum_abac::policy::{PolicyConditions, VerificationConditions, create_policy};
//! use lyceum_abac::{EvaluationContext, Evaluator, UserAttributes};
//! use lyceum_rbac::Role;
//! use lyceum_types::Action;
//!
//! let user = UserAttributes::new("usr-1", "t@school.example")
//!     .with_global_role(Role::Teacher)
//!     .with_kyc(KycProfile::verified());
//!
//! let policy = create_policy(
//!     "grades",
//!     Action::Read,
//!     PolicyConditions::default()
//!         .with_any_of_roles([Role::Teacher])
//!         .with_verification(VerificationConditions::require_kyc()),
//! );
//!
//! let evaluator = Evaluator::default();
//! let decision = evaluator
//!     .validate_access(&user, &policy, &EvaluationContext::default())
//!     .expect("no custom predicates involved");
//! assert!(decision.granted);
//! ```

pub mod attributes;
pub mod cache;
pub mod evaluator;
pub mod factories;
pub mod policy;
pub mod predicates;

// Re-export commonly used types
pub use attributes::{EvaluationContext, UserAttributes};
pub use cache::DecisionCache;
pub use evaluator::{EvaluationError, Evaluator, ValidationResult};
pub use policy::{AccessPolicy, PolicyConditions, RoleMatchStrategy, create_policy};
pub use predicates::PredicateRegistry;
