//! ABAC policy evaluation engine.
//!
//! Runs five condition evaluators in a fixed order and returns the first
//! failure (fail-fast): roles, verification, school context, environment,
//! custom predicates. Ordinary rule mismatches are not errors — they produce
//! a denied [`ValidationResult`] with a reason. Only collaborator faults
//! (unknown or failing predicates) surface as [`EvaluationError`], and those
//! deny by default at the middleware boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::attributes::{EvaluationContext, UserAttributes};
use crate::policy::{
    AccessPolicy, CustomCondition, EnvironmentConditions, MatchSet, PolicyConditions,
    RoleMatchStrategy, SchoolConditions, VerificationConditions,
};
use crate::predicates::PredicateRegistry;

use lyceum_rbac::Role;

// ============================================================================
// ValidationResult
// ============================================================================

/// The outcome of evaluating one subject against one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether access is granted.
    pub granted: bool,
    /// Populated exactly when `granted` is false: the first failing
    /// condition group's message.
    pub reason: Option<String>,
}

impl ValidationResult {
    /// A granted result.
    pub fn granted() -> Self {
        Self {
            granted: true,
            reason: None,
        }
    }

    /// A denied result with the given reason.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Internal evaluation faults. Never produced by ordinary rule mismatches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A policy referenced a predicate name missing from the registry.
    #[error("unknown custom predicate: {name}")]
    UnknownPredicate { name: String },

    /// A custom predicate reported an internal failure.
    #[error("custom predicate '{name}' failed: {detail}")]
    PredicateFailed { name: String, detail: String },
}

/// Result type for evaluation operations.
pub type EvaluationResult<T> = Result<T, EvaluationError>;

// ============================================================================
// Evaluator
// ============================================================================

/// The decision engine: five condition evaluators plus a predicate registry.
///
/// Stateless apart from the registry; safe to share across requests behind
/// an `Arc`.
#[derive(Debug)]
pub struct Evaluator {
    registry: PredicateRegistry,
}

impl Default for Evaluator {
    /// An evaluator with the built-in predicates registered.
    fn default() -> Self {
        Self::new(PredicateRegistry::with_builtins())
    }
}

impl Evaluator {
    /// Creates an evaluator over the given predicate registry.
    pub fn new(registry: PredicateRegistry) -> Self {
        Self { registry }
    }

    /// The predicate registry backing custom conditions.
    pub fn registry(&self) -> &PredicateRegistry {
        &self.registry
    }

    /// Evaluates a subject against a policy.
    ///
    /// Condition groups run in a fixed order — roles, verification, school,
    /// environment, custom — and the first failing group determines the
    /// denial reason; later groups are not evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] only for collaborator faults (an unknown
    /// predicate name, or a predicate that itself fails). Callers must
    /// treat that as a denial, never a grant.
    pub fn validate_access(
        &self,
        user: &UserAttributes,
        policy: &AccessPolicy,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<ValidationResult> {
        let conditions = &policy.conditions;

        if let Err(reason) = check_roles(user, conditions, policy.role_matching) {
            return Ok(deny(policy, reason));
        }
        if let Err(reason) = check_verification(user, conditions.verification.as_ref()) {
            return Ok(deny(policy, reason));
        }
        if let Err(reason) = check_school(user, ctx, conditions.school.as_ref()) {
            return Ok(deny(policy, reason));
        }
        if let Err(reason) = check_environment(user, ctx, conditions.environment.as_ref()) {
            return Ok(deny(policy, reason));
        }
        if let Some(reason) = self.check_custom(user, ctx, &conditions.custom)? {
            return Ok(deny(policy, reason));
        }

        debug!(
            subject = %user.id,
            resource = %policy.resource,
            action = %policy.action,
            "access granted"
        );
        Ok(ValidationResult::granted())
    }

    /// Runs the custom predicates in order. Returns the first denial
    /// message, or `None` if all pass.
    fn check_custom(
        &self,
        user: &UserAttributes,
        ctx: &EvaluationContext,
        conditions: &[CustomCondition],
    ) -> EvaluationResult<Option<String>> {
        for condition in conditions {
            let predicate = self.registry.get(&condition.predicate).ok_or_else(|| {
                EvaluationError::UnknownPredicate {
                    name: condition.predicate.clone(),
                }
            })?;

            match predicate(user, ctx) {
                Ok(true) => {}
                Ok(false) => return Ok(Some(condition.error_message.clone())),
                Err(detail) => {
                    return Err(EvaluationError::PredicateFailed {
                        name: condition.predicate.clone(),
                        detail,
                    });
                }
            }
        }
        Ok(None)
    }
}

fn deny(policy: &AccessPolicy, reason: String) -> ValidationResult {
    debug!(
        resource = %policy.resource,
        action = %policy.action,
        %reason,
        "access denied"
    );
    ValidationResult::denied(reason)
}

// ============================================================================
// 1. Roles
// ============================================================================

fn role_matches(user: &UserAttributes, required: Role, strategy: RoleMatchStrategy) -> bool {
    match strategy {
        RoleMatchStrategy::Exact => user.holds_role(required),
        RoleMatchStrategy::Hierarchical => user.holds_role_or_superior(required),
    }
}

fn check_roles(
    user: &UserAttributes,
    conditions: &PolicyConditions,
    strategy: RoleMatchStrategy,
) -> Result<(), String> {
    if let Some(any_of) = &conditions.any_of {
        check_any_of(user, any_of, strategy)?;
    }
    if let Some(all_of) = &conditions.all_of {
        check_all_of(user, all_of, strategy)?;
    }
    Ok(())
}

fn check_any_of(
    user: &UserAttributes,
    any_of: &MatchSet,
    strategy: RoleMatchStrategy,
) -> Result<(), String> {
    if any_of.is_empty() {
        return Ok(());
    }

    let role_hit = any_of
        .roles
        .iter()
        .any(|role| role_matches(user, *role, strategy));
    if role_hit {
        return Ok(());
    }

    if !any_of.permissions.is_empty() {
        let held = user.effective_permissions();
        if any_of.permissions.iter().any(|p| held.contains(*p)) {
            return Ok(());
        }
    }

    if any_of.roles.is_empty() {
        Err("User does not have any of the required permissions".to_string())
    } else {
        Err("User does not have any of the required roles".to_string())
    }
}

fn check_all_of(
    user: &UserAttributes,
    all_of: &MatchSet,
    strategy: RoleMatchStrategy,
) -> Result<(), String> {
    let roles_ok = all_of
        .roles
        .iter()
        .all(|role| role_matches(user, *role, strategy));
    if !roles_ok {
        return Err("User does not have all required roles".to_string());
    }

    if !all_of.permissions.is_empty() {
        let held = user.effective_permissions();
        if !all_of.permissions.iter().all(|p| held.contains(*p)) {
            return Err("User does not have all required permissions".to_string());
        }
    }
    Ok(())
}

// ============================================================================
// 2. Verification
// ============================================================================

fn check_verification(
    user: &UserAttributes,
    conditions: Option<&VerificationConditions>,
) -> Result<(), String> {
    let Some(conditions) = conditions else {
        return Ok(());
    };

    if conditions.require_kyc && !user.kyc.status.is_verified() {
        return Err("KYC verification required".to_string());
    }

    if !conditions.kyc_status.is_empty() && !conditions.kyc_status.contains(&user.kyc.status) {
        return Err("KYC status does not meet policy requirements".to_string());
    }

    if !conditions.employment_status.is_empty()
        && !conditions.employment_status.contains(&user.employment.status)
    {
        return Err("Employment status does not meet policy requirements".to_string());
    }

    if !conditions.officer_permissions.is_empty() {
        // Fails closed: no officer standing means no officer permissions.
        let Some(officer) = &user.kyc.officer_status else {
            return Err("KYC officer permissions required".to_string());
        };
        let all_held = conditions
            .officer_permissions
            .iter()
            .all(|p| officer.permissions.allows(*p));
        if !all_held {
            return Err("KYC officer permissions required".to_string());
        }
    }

    Ok(())
}

// ============================================================================
// 3. School context
// ============================================================================

fn check_school(
    user: &UserAttributes,
    ctx: &EvaluationContext,
    conditions: Option<&SchoolConditions>,
) -> Result<(), String> {
    let Some(conditions) = conditions else {
        return Ok(());
    };

    if conditions.must_be_in_school && user.school_roles.is_empty() {
        return Err("User is not a member of any school".to_string());
    }

    if conditions.must_be_current_school {
        let current = user
            .context
            .current_school_id
            .as_ref()
            .or(ctx.current_school.as_ref());
        if current.is_none() {
            return Err("No current school context".to_string());
        }
    }

    if conditions.must_be_owner && !user.is_school_owner() {
        return Err("User is not a school owner".to_string());
    }

    if !conditions.allowed_roles.is_empty() {
        let permitted = user.school_roles.values().any(|membership| {
            membership
                .roles
                .iter()
                .any(|role| conditions.allowed_roles.contains(role))
        });
        if !permitted {
            return Err("User's school roles are not permitted for this resource".to_string());
        }
    }

    Ok(())
}

// ============================================================================
// 4. Environment
// ============================================================================

fn check_environment(
    user: &UserAttributes,
    ctx: &EvaluationContext,
    conditions: Option<&EnvironmentConditions>,
) -> Result<(), String> {
    let client_ip = user.context.location.as_ref().map(|l| l.ip.as_str());

    if let Some(conditions) = conditions {
        if let Some(ip) = &conditions.ip {
            check_ip(client_ip, ip.allowlist.as_deref(), ip.denylist.as_deref())?;
        }

        if let Some(time) = &conditions.time {
            if !time.contains(ctx.resolved_now()) {
                return Err("Access outside permitted hours".to_string());
            }
        }

        if let Some(device) = &conditions.device {
            // Fails closed: restrictions with no device info deny.
            let Some(info) = &user.context.device else {
                return Err("No device information available".to_string());
            };
            if !device.kinds.is_empty() && !device.kinds.contains(&info.kind) {
                return Err("Device type not permitted".to_string());
            }
            if device.require_trusted && !info.is_trusted() {
                return Err("Device is not trusted".to_string());
            }
        }

        if let Some(location) = &conditions.location {
            let info = user.context.location.as_ref();
            if !location.countries.is_empty() {
                let country = info.and_then(|l| l.country.as_deref());
                let permitted = country.is_some_and(|c| location.countries.iter().any(|p| p == c));
                if !permitted {
                    return Err("Country not permitted".to_string());
                }
            }
            if !location.regions.is_empty() {
                let region = info.and_then(|l| l.region.as_deref());
                let permitted = region.is_some_and(|r| location.regions.iter().any(|p| p == r));
                if !permitted {
                    return Err("Region not permitted".to_string());
                }
            }
        }
    }

    // Subject-level restrictions apply regardless of the policy's own
    // environment group.
    let restrictions = &user.access.restrictions;

    if let Some(whitelist) = &restrictions.ip_whitelist {
        let permitted = client_ip.is_some_and(|ip| whitelist.iter().any(|p| p == ip));
        if !permitted {
            return Err("IP address not in account whitelist".to_string());
        }
    }

    if let Some(countries) = &restrictions.allowed_countries {
        let country = user
            .context
            .location
            .as_ref()
            .and_then(|l| l.country.as_deref());
        let permitted = country.is_some_and(|c| countries.iter().any(|p| p == c));
        if !permitted {
            return Err("Country not permitted for this account".to_string());
        }
    }

    if let Some(time) = &restrictions.time_restrictions {
        if !time.contains(ctx.resolved_now()) {
            return Err("Access outside account permitted hours".to_string());
        }
    }

    Ok(())
}

fn check_ip(
    client_ip: Option<&str>,
    allowlist: Option<&[String]>,
    denylist: Option<&[String]>,
) -> Result<(), String> {
    if allowlist.is_some() || denylist.is_some() {
        // Fails closed: an IP restriction with no client IP denies.
        let Some(ip) = client_ip else {
            return Err("No IP address available for IP-restricted policy".to_string());
        };
        if let Some(allowlist) = allowlist {
            if !allowlist.iter().any(|p| p == ip) {
                return Err("IP address not in allowlist".to_string());
            }
        }
        if let Some(denylist) = denylist {
            if denylist.iter().any(|p| p == ip) {
                return Err("IP address is blocked".to_string());
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
