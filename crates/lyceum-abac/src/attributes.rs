//! Attribute types for ABAC evaluation.
//!
//! The authorization subject is a [`UserAttributes`] value: roles, KYC and
//! employment verification state, account access restrictions, and the
//! per-request context (school, device, location). It is assembled by the
//! attribute-collection service upstream, is immutable for the duration of
//! one evaluation, and is never persisted by this crate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lyceum_rbac::{PermissionSet, Role, flatten_permissions};
use lyceum_types::{AccountStatus, EmploymentStatus, KycStatus, SchoolId, UserId};

use crate::policy::TimeRestrictions;

/// Trust score at or above which a device counts as trusted.
pub const TRUSTED_DEVICE_THRESHOLD: u8 = 70;

// ============================================================================
// Device and location
// ============================================================================

/// The kind of device making the access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    /// Desktop workstation or laptop.
    Desktop,
    /// Mobile phone.
    Mobile,
    /// Tablet.
    Tablet,
    /// Server or automated system.
    Server,
    /// Unknown or unclassified device.
    Unknown,
}

/// Device information attached to the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device identifier from the `x-device-id` header.
    pub id: String,
    /// Device classification from the `x-device-type` header.
    pub kind: DeviceKind,
    /// Trust score 0-100 assigned by the device-trust service.
    pub trust_score: u8,
    /// When the device last completed verification.
    pub last_verified: Option<DateTime<Utc>>,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            trust_score: 0,
            last_verified: None,
        }
    }

    /// Sets the trust score.
    #[must_use]
    pub fn with_trust_score(mut self, score: u8) -> Self {
        self.trust_score = score;
        self
    }

    /// Returns whether the device meets the trust threshold.
    pub fn is_trusted(&self) -> bool {
        self.trust_score >= TRUSTED_DEVICE_THRESHOLD
    }
}

/// Network location of the request origin.
///
/// Country and region are resolved by the gateway's geo lookup and may be
/// absent; restriction checks fail closed on missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    /// Client IP address (string form to avoid `IpAddr` serde issues).
    pub ip: String,
    /// ISO 3166-1 alpha-2 country code (e.g. "US", "NG").
    pub country: Option<String>,
    /// Region or state within the country.
    pub region: Option<String>,
}

impl LocationInfo {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            country: None,
            region: None,
        }
    }

    /// Sets the country code.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

// ============================================================================
// KYC profile
// ============================================================================

/// Enum-keyed officer permission, used by policy conditions.
///
/// Keeping this an enum (rather than indexing permission flags by string)
/// means an unknown permission name is a type error, not a silent `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfficerPermission {
    /// May verify a subject's identity.
    VerifyIdentity,
    /// May verify supporting documents.
    VerifyDocuments,
    /// May give final approval to a KYC case.
    ApproveKyc,
}

/// Permission flags held by a KYC officer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerPermissions {
    pub can_verify_identity: bool,
    pub can_verify_documents: bool,
    pub can_approve_kyc: bool,
}

impl OfficerPermissions {
    /// Returns whether the named permission flag is set.
    pub fn allows(self, permission: OfficerPermission) -> bool {
        match permission {
            OfficerPermission::VerifyIdentity => self.can_verify_identity,
            OfficerPermission::VerifyDocuments => self.can_verify_documents,
            OfficerPermission::ApproveKyc => self.can_approve_kyc,
        }
    }
}

/// KYC officer standing: permission flags, specializations, current workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerStatus {
    pub permissions: OfficerPermissions,
    pub specializations: Vec<String>,
    pub workload: u32,
}

/// The subject's identity-verification state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycProfile {
    pub status: KycStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub document_ids: Vec<String>,
    /// Present only for users who are themselves KYC officers.
    pub officer_status: Option<OfficerStatus>,
}

impl KycProfile {
    /// A verified profile stamped now. Convenience for tests and skeletons.
    pub fn verified() -> Self {
        Self {
            status: KycStatus::Verified,
            verified_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Sets the officer standing.
    #[must_use]
    pub fn with_officer_status(mut self, officer: OfficerStatus) -> Self {
        self.officer_status = Some(officer);
        self
    }
}

// ============================================================================
// Employment profile
// ============================================================================

/// The subject's employment-eligibility state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentProfile {
    pub status: EmploymentStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<UserId>,
    pub document_ids: Vec<String>,
    /// Schools where the subject is currently employed.
    pub current_schools: Vec<SchoolId>,
}

impl EmploymentProfile {
    /// An eligible profile stamped now. Convenience for tests and skeletons.
    pub fn eligible() -> Self {
        Self {
            status: EmploymentStatus::Eligible,
            verified_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

// ============================================================================
// Account access state
// ============================================================================

/// Account-level restrictions configured by an administrator or the user.
///
/// These travel with the subject and apply regardless of which policy is
/// being evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRestrictions {
    /// If set, requests must originate from one of these IP addresses.
    pub ip_whitelist: Option<Vec<String>>,
    /// If set, requests must originate from one of these countries.
    pub allowed_countries: Option<Vec<String>>,
    /// If set, requests are only permitted inside this window.
    pub time_restrictions: Option<TimeRestrictions>,
}

/// Account security state: lockout, login history, restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessProfile {
    pub failed_attempts: u32,
    pub last_login: Option<DateTime<Utc>>,
    /// Set while the account is locked out after repeated failures.
    pub locked_until: Option<DateTime<Utc>>,
    pub social_enabled: bool,
    pub restrictions: AccountRestrictions,
}

impl AccessProfile {
    /// Returns whether the account is locked at `now`.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

// ============================================================================
// Request context attributes
// ============================================================================

/// Per-request context attached to the subject by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAttributes {
    /// School the request is acting within (`x-school-id` header).
    pub current_school_id: Option<SchoolId>,
    /// Role the user selected for this session, if any.
    pub current_role: Option<Role>,
    pub device: Option<DeviceInfo>,
    pub location: Option<LocationInfo>,
}

// ============================================================================
// School membership
// ============================================================================

/// A user's standing within one school: roles, explicit permission grants,
/// and communication channels.
///
/// Role assignment is always attributable: `assigned_by` is required and
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolMembership {
    pub roles: Vec<Role>,
    /// Explicit grants on top of the role → permission table.
    pub permissions: PermissionSet,
    /// Channel names the member may post to (school-defined strings).
    pub communication_permissions: Vec<String>,
    pub assigned_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl SchoolMembership {
    /// Creates an empty membership assigned by `assigned_by`.
    pub fn new(assigned_by: impl Into<UserId>) -> Self {
        let assigned_by = assigned_by.into();
        assert!(
            !assigned_by.is_empty(),
            "school role assignment must be attributable"
        );
        Self {
            roles: Vec::new(),
            permissions: PermissionSet::empty(),
            communication_permissions: Vec::new(),
            assigned_by,
            created_at: Utc::now(),
        }
    }

    /// Adds a role to the membership.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Adds an explicit permission grant.
    #[must_use]
    pub fn with_permission(mut self, permission: lyceum_rbac::Permission) -> Self {
        self.permissions.grant(permission);
        self
    }

    /// Sets the assignment timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

// ============================================================================
// User attributes
// ============================================================================

/// The authorization subject.
///
/// Constructed fresh per request by the attribute-collection service (from
/// a JWT skeleton, or enriched from the database), then read by every
/// condition evaluator. Treated as immutable for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAttributes {
    pub id: UserId,
    pub email: String,
    pub status: AccountStatus,
    /// Platform-wide roles.
    pub global_roles: Vec<Role>,
    /// Per-school role grants. A school appears at most once.
    pub school_roles: HashMap<SchoolId, SchoolMembership>,
    pub kyc: KycProfile,
    pub employment: EmploymentProfile,
    pub access: AccessProfile,
    pub context: RequestAttributes,
}

impl UserAttributes {
    /// Creates a minimal active subject with no roles or verification state.
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            status: AccountStatus::Active,
            global_roles: Vec::new(),
            school_roles: HashMap::new(),
            kyc: KycProfile::default(),
            employment: EmploymentProfile::default(),
            access: AccessProfile::default(),
            context: RequestAttributes::default(),
        }
    }

    /// Sets the account status.
    #[must_use]
    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    /// Adds a platform-wide role.
    #[must_use]
    pub fn with_global_role(mut self, role: Role) -> Self {
        if !self.global_roles.contains(&role) {
            self.global_roles.push(role);
        }
        self
    }

    /// Adds (or replaces) the membership for one school.
    #[must_use]
    pub fn with_school_membership(
        mut self,
        school: impl Into<SchoolId>,
        membership: SchoolMembership,
    ) -> Self {
        self.school_roles.insert(school.into(), membership);
        self
    }

    /// Sets the KYC profile.
    #[must_use]
    pub fn with_kyc(mut self, kyc: KycProfile) -> Self {
        self.kyc = kyc;
        self
    }

    /// Sets the employment profile.
    #[must_use]
    pub fn with_employment(mut self, employment: EmploymentProfile) -> Self {
        self.employment = employment;
        self
    }

    /// Sets the account access state.
    #[must_use]
    pub fn with_access(mut self, access: AccessProfile) -> Self {
        self.access = access;
        self
    }

    /// Sets the per-request context attributes.
    #[must_use]
    pub fn with_context(mut self, context: RequestAttributes) -> Self {
        self.context = context;
        self
    }

    /// All roles the subject holds, global first, then school-scoped.
    pub fn all_roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.global_roles.iter().copied().chain(
            self.school_roles
                .values()
                .flat_map(|m| m.roles.iter().copied()),
        )
    }

    /// Returns whether the subject holds `role` exactly, globally or in any
    /// school.
    pub fn holds_role(&self, role: Role) -> bool {
        self.all_roles().any(|held| held == role)
    }

    /// Returns whether any held role dominates `role` (hierarchy-aware).
    pub fn holds_role_or_superior(&self, role: Role) -> bool {
        self.all_roles().any(|held| held.dominates(role))
    }

    /// Returns whether the subject owns any school.
    pub fn is_school_owner(&self) -> bool {
        self.school_roles
            .values()
            .any(|m| m.roles.contains(&Role::SchoolOwner))
    }

    /// The membership for a given school, if any.
    pub fn membership(&self, school: &SchoolId) -> Option<&SchoolMembership> {
        self.school_roles.get(school)
    }

    /// Flattens the subject's permissions: role-derived permissions for
    /// every held role, plus explicit per-school grants.
    pub fn effective_permissions(&self) -> PermissionSet {
        let mut set = flatten_permissions(self.all_roles());
        for membership in self.school_roles.values() {
            set.extend(&membership.permissions);
        }
        set
    }
}

// ============================================================================
// Evaluation context
// ============================================================================

/// Per-request context handed to `validate_access` alongside the subject.
///
/// Carries the values that are request-scoped rather than subject-scoped:
/// an optional clock override (so time-restriction checks are
/// deterministic under test), the school the caller is acting in when it
/// is not already on the subject, and free-form values for custom
/// predicates.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    /// Clock override; `None` means "now".
    pub now: Option<DateTime<Utc>>,
    /// Current school when not carried on the subject's context.
    pub current_school: Option<SchoolId>,
    /// Free-form values consumed by custom predicates.
    pub extra: HashMap<String, serde_json::Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the evaluation clock.
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Sets the current school.
    #[must_use]
    pub fn with_current_school(mut self, school: impl Into<SchoolId>) -> Self {
        self.current_school = Some(school.into());
        self
    }

    /// Attaches a free-form value for custom predicates.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The effective evaluation clock.
    pub fn resolved_now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lyceum_rbac::Permission;

    #[test]
    fn test_user_attributes_builder() {
        let user = UserAttributes::new("usr-1", "teacher@school.example")
            .with_global_role(Role::Teacher)
            .with_school_membership(
                "sch-1",
                SchoolMembership::new("usr-admin").with_role(Role::Teacher),
            );

        assert_eq!(user.id, UserId::from("usr-1"));
        assert_eq!(user.status, AccountStatus::Active);
        assert_eq!(user.global_roles, vec![Role::Teacher]);
        assert!(user.membership(&SchoolId::from("sch-1")).is_some());
    }

    #[test]
    fn test_duplicate_global_role_is_noop() {
        let user = UserAttributes::new("usr-1", "t@x.example")
            .with_global_role(Role::Teacher)
            .with_global_role(Role::Teacher);
        assert_eq!(user.global_roles.len(), 1);
    }

    #[test]
    fn test_school_appears_at_most_once() {
        let user = UserAttributes::new("usr-1", "t@x.example")
            .with_school_membership("sch-1", SchoolMembership::new("a").with_role(Role::Teacher))
            .with_school_membership(
                "sch-1",
                SchoolMembership::new("b").with_role(Role::SchoolAdmin),
            );

        assert_eq!(user.school_roles.len(), 1);
        let membership = user.membership(&SchoolId::from("sch-1")).unwrap();
        assert_eq!(membership.roles, vec![Role::SchoolAdmin]);
    }

    #[test]
    #[should_panic(expected = "attributable")]
    fn test_membership_requires_assigner() {
        SchoolMembership::new("");
    }

    #[test]
    fn test_holds_role_checks_school_roles() {
        let user = UserAttributes::new("usr-1", "t@x.example").with_school_membership(
            "sch-1",
            SchoolMembership::new("admin").with_role(Role::Teacher),
        );

        assert!(user.holds_role(Role::Teacher));
        assert!(!user.holds_role(Role::SchoolAdmin));
    }

    #[test]
    fn test_holds_role_or_superior() {
        let user = UserAttributes::new("usr-1", "a@x.example").with_global_role(Role::SchoolAdmin);

        assert!(user.holds_role_or_superior(Role::Teacher));
        assert!(user.holds_role_or_superior(Role::SchoolAdmin));
        assert!(!user.holds_role_or_superior(Role::SchoolOwner));
        assert!(!user.holds_role(Role::Teacher));
    }

    #[test]
    fn test_effective_permissions_include_explicit_grants() {
        let user = UserAttributes::new("usr-1", "t@x.example").with_school_membership(
            "sch-1",
            SchoolMembership::new("admin")
                .with_role(Role::Teacher)
                .with_permission(Permission::ManageEnrollment),
        );

        let permissions = user.effective_permissions();
        assert!(permissions.contains(Permission::RecordGrades)); // from role
        assert!(permissions.contains(Permission::ManageEnrollment)); // explicit
        assert!(!permissions.contains(Permission::ManageSchool));
    }

    #[test]
    fn test_device_trust_threshold() {
        let device = DeviceInfo::new("dev-1", DeviceKind::Mobile).with_trust_score(70);
        assert!(device.is_trusted());
        let device = DeviceInfo::new("dev-2", DeviceKind::Mobile).with_trust_score(69);
        assert!(!device.is_trusted());
    }

    #[test]
    fn test_officer_permissions_allows() {
        let permissions = OfficerPermissions {
            can_verify_identity: true,
            can_verify_documents: false,
            can_approve_kyc: false,
        };
        assert!(permissions.allows(OfficerPermission::VerifyIdentity));
        assert!(!permissions.allows(OfficerPermission::VerifyDocuments));
        assert!(!permissions.allows(OfficerPermission::ApproveKyc));
    }

    #[test]
    fn test_account_lock_window() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let mut access = AccessProfile::default();
        assert!(!access.is_locked(now));

        access.locked_until = Some(now + chrono::Duration::minutes(10));
        assert!(access.is_locked(now));

        access.locked_until = Some(now - chrono::Duration::minutes(10));
        assert!(!access.is_locked(now));
    }

    #[test]
    fn test_evaluation_context_clock() {
        let pinned = Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap();
        let ctx = EvaluationContext::new().with_now(pinned);
        assert_eq!(ctx.resolved_now(), pinned);
    }

    #[test]
    fn test_user_attributes_serde_round_trip() {
        let user = UserAttributes::new("usr-1", "t@x.example")
            .with_global_role(Role::Teacher)
            .with_kyc(KycProfile::verified());
        let json = serde_json::to_string(&user).expect("serialize user");
        let back: UserAttributes = serde_json::from_str(&json).expect("deserialize user");
        assert_eq!(back, user);
    }
}
