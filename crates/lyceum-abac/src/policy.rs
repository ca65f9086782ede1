//! ABAC policy definitions.
//!
//! A policy is a declarative `(resource, action, conditions)` tuple. Each
//! condition group is independently optional; an absent group is vacuously
//! satisfied. Policies are built once (usually through a factory), treated
//! as read-only by evaluators, and reused across many evaluations.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use lyceum_rbac::{Permission, Role};
use lyceum_types::{Action, EmploymentStatus, KycStatus};

use crate::attributes::{DeviceKind, OfficerPermission};

// ============================================================================
// Role matching strategy
// ============================================================================

/// How role conditions resolve against the subject's held roles.
///
/// The two strategies are *not* equivalent: under `Hierarchical`, a
/// `SchoolOwner` satisfies a policy requiring `Teacher` because the owner
/// role structurally outranks it; under `Exact` it does not. The strategy
/// is an explicit field on every policy so the choice is visible at the
/// call site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleMatchStrategy {
    /// A listed role must be held verbatim.
    #[default]
    Exact,
    /// A held role that dominates a listed role also matches.
    Hierarchical,
}

impl RoleMatchStrategy {
    /// Returns the canonical wire name of the strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            RoleMatchStrategy::Exact => "EXACT",
            RoleMatchStrategy::Hierarchical => "HIERARCHICAL",
        }
    }
}

// ============================================================================
// Condition groups
// ============================================================================

/// Roles and permissions for `anyOf`/`allOf` matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl MatchSet {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}

/// Identity and employment verification requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConditions {
    /// Requires `kyc.status == VERIFIED`.
    #[serde(default)]
    pub require_kyc: bool,
    /// Accepted KYC statuses, when non-empty.
    #[serde(default)]
    pub kyc_status: Vec<KycStatus>,
    /// Accepted employment statuses, when non-empty.
    #[serde(default)]
    pub employment_status: Vec<EmploymentStatus>,
    /// Officer permission flags that must all be set. A subject without
    /// officer standing fails these, it does not skip them.
    #[serde(default)]
    pub officer_permissions: Vec<OfficerPermission>,
}

impl VerificationConditions {
    /// Conditions requiring only a verified KYC.
    pub fn require_kyc() -> Self {
        Self {
            require_kyc: true,
            ..Self::default()
        }
    }
}

/// School-scoping requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolConditions {
    /// Subject must hold at least one school membership.
    #[serde(default)]
    pub must_be_in_school: bool,
    /// Subject must own some school.
    #[serde(default)]
    pub must_be_owner: bool,
    /// The request must carry a current-school context.
    #[serde(default)]
    pub must_be_current_school: bool,
    /// Some school membership must intersect this role list, when non-empty.
    #[serde(default)]
    pub allowed_roles: Vec<Role>,
}

/// IP-based restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRestrictions {
    /// When present, the client IP must be in this list.
    #[serde(default)]
    pub allowlist: Option<Vec<String>>,
    /// When present, the client IP must not be in this list.
    #[serde(default)]
    pub denylist: Option<Vec<String>>,
}

/// Time-of-day and day-of-week restrictions.
///
/// Hours are half-open: `[start_hour, end_hour)` in the policy's timezone.
/// Timezones are fixed UTC offsets configured per policy (school-local
/// offsets), not IANA zone names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRestrictions {
    /// Permitted weekdays. Empty means every day.
    #[serde(default)]
    pub allowed_days: Vec<Weekday>,
    /// First permitted hour of day (0-23), inclusive.
    pub start_hour: u8,
    /// First hour past the window (1-24), exclusive.
    pub end_hour: u8,
    /// Offset from UTC, in minutes (e.g. 60 for UTC+1).
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl TimeRestrictions {
    /// Weekday business hours, 09:00-17:00 UTC.
    pub fn business_hours() -> Self {
        Self {
            allowed_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            start_hour: 9,
            end_hour: 17,
            utc_offset_minutes: 0,
        }
    }

    /// Returns whether `ts` falls inside the permitted window.
    ///
    /// An unrepresentable offset fails closed.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let Some(offset) = FixedOffset::east_opt(self.utc_offset_minutes * 60) else {
            return false;
        };
        let local = ts.with_timezone(&offset);

        let day_ok =
            self.allowed_days.is_empty() || self.allowed_days.contains(&local.weekday());
        let hour = local.hour();
        let hour_ok = hour >= u32::from(self.start_hour) && hour < u32::from(self.end_hour);

        day_ok && hour_ok
    }
}

/// Device restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRestrictions {
    /// Permitted device kinds, when non-empty.
    #[serde(default)]
    pub kinds: Vec<DeviceKind>,
    /// Requires the device's trust score to meet the trust threshold.
    #[serde(default)]
    pub require_trusted: bool,
}

/// Geographic restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRestrictions {
    /// Permitted countries, when non-empty.
    #[serde(default)]
    pub countries: Vec<String>,
    /// Permitted regions, when non-empty.
    #[serde(default)]
    pub regions: Vec<String>,
}

/// Environmental restrictions: network, time, device, and location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConditions {
    #[serde(default)]
    pub ip: Option<IpRestrictions>,
    #[serde(default)]
    pub time: Option<TimeRestrictions>,
    #[serde(default)]
    pub device: Option<DeviceRestrictions>,
    #[serde(default)]
    pub location: Option<LocationRestrictions>,
}

/// A custom condition: a named predicate from the registry plus the exact
/// message surfaced when it denies.
///
/// Policies reference predicates by name so the policy itself stays
/// declarative and serializable; the executable part lives in the
/// [`crate::predicates::PredicateRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCondition {
    pub predicate: String,
    pub error_message: String,
}

impl CustomCondition {
    pub fn new(predicate: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            error_message: error_message.into(),
        }
    }
}

// ============================================================================
// PolicyConditions
// ============================================================================

/// The full condition vocabulary of a policy.
///
/// Every group is optional; the default value (all groups absent) grants
/// every subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyConditions {
    /// At least one listed role or permission must match.
    #[serde(default)]
    pub any_of: Option<MatchSet>,
    /// Every listed role and permission must match.
    #[serde(default)]
    pub all_of: Option<MatchSet>,
    #[serde(default)]
    pub verification: Option<VerificationConditions>,
    #[serde(default)]
    pub school: Option<SchoolConditions>,
    #[serde(default)]
    pub environment: Option<EnvironmentConditions>,
    /// Evaluated in order, after every other group.
    #[serde(default)]
    pub custom: Vec<CustomCondition>,
}

impl PolicyConditions {
    /// Adds roles to the `anyOf` group (builder pattern).
    #[must_use]
    pub fn with_any_of_roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        self.any_of.get_or_insert_default().roles.extend(roles);
        self
    }

    /// Adds permissions to the `anyOf` group.
    #[must_use]
    pub fn with_any_of_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.any_of
            .get_or_insert_default()
            .permissions
            .extend(permissions);
        self
    }

    /// Adds roles to the `allOf` group.
    #[must_use]
    pub fn with_all_of_roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        self.all_of.get_or_insert_default().roles.extend(roles);
        self
    }

    /// Adds permissions to the `allOf` group.
    #[must_use]
    pub fn with_all_of_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.all_of
            .get_or_insert_default()
            .permissions
            .extend(permissions);
        self
    }

    /// Sets the verification group.
    #[must_use]
    pub fn with_verification(mut self, verification: VerificationConditions) -> Self {
        self.verification = Some(verification);
        self
    }

    /// Sets the school-scoping group.
    #[must_use]
    pub fn with_school(mut self, school: SchoolConditions) -> Self {
        self.school = Some(school);
        self
    }

    /// Sets the environment group.
    #[must_use]
    pub fn with_environment(mut self, environment: EnvironmentConditions) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Appends a custom condition.
    #[must_use]
    pub fn with_custom(
        mut self,
        predicate: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        self.custom.push(CustomCondition::new(predicate, error_message));
        self
    }
}

// ============================================================================
// AccessPolicy
// ============================================================================

/// A declarative access policy for one resource/action pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub resource: String,
    pub action: Action,
    /// How role conditions match; defaults to [`RoleMatchStrategy::Exact`].
    #[serde(default)]
    pub role_matching: RoleMatchStrategy,
    #[serde(default)]
    pub conditions: PolicyConditions,
}

impl AccessPolicy {
    /// Creates a policy with exact role matching.
    pub fn new(resource: impl Into<String>, action: Action, conditions: PolicyConditions) -> Self {
        Self {
            resource: resource.into(),
            action,
            role_matching: RoleMatchStrategy::Exact,
            conditions,
        }
    }

    /// Selects the role-matching strategy (builder pattern).
    #[must_use]
    pub fn with_role_matching(mut self, strategy: RoleMatchStrategy) -> Self {
        self.role_matching = strategy;
        self
    }
}

/// Creates a policy; the construction entry point exposed to services.
pub fn create_policy(
    resource: impl Into<String>,
    action: Action,
    conditions: PolicyConditions,
) -> AccessPolicy {
    AccessPolicy::new(resource, action, conditions)
}

// ============================================================================
// Tests
// ============================================================================
