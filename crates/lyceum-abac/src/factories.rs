//! Policy factories for platform resources.
//!
//! Each consuming service builds its `AccessPolicy` values through these
//! constructors instead of hand-assembling condition literals. Factories
//! are pure functions with no shared state; they exist for readability and
//! reuse and are not part of the evaluation contract.

use lyceum_rbac::{Permission, Role};
use lyceum_types::Action;

use crate::attributes::OfficerPermission;
use crate::policy::{
    AccessPolicy, DeviceRestrictions, EnvironmentConditions, PolicyConditions, RoleMatchStrategy,
    SchoolConditions, TimeRestrictions, VerificationConditions, create_policy,
};

/// School registration: platform or school admins with verified KYC and
/// eligible employment, during business hours.
pub fn school_registration() -> AccessPolicy {
    create_policy(
        "school",
        Action::Create,
        PolicyConditions::default()
            .with_any_of_roles([Role::SystemAdmin, Role::SchoolAdmin])
            .with_verification(VerificationConditions {
                require_kyc: true,
                employment_status: vec![lyceum_types::EmploymentStatus::Eligible],
                ..VerificationConditions::default()
            })
            .with_environment(EnvironmentConditions {
                time: Some(TimeRestrictions::business_hours()),
                ..EnvironmentConditions::default()
            }),
    )
}

/// KYC case handling. The officer permission flags scale with the action:
/// reviewing (`Update`) needs identity and document verification rights;
/// final approval (`Manage`) needs the approval flag.
pub fn kyc_verification(action: Action) -> AccessPolicy {
    let officer_permissions = match action {
        Action::Update => vec![
            OfficerPermission::VerifyIdentity,
            OfficerPermission::VerifyDocuments,
        ],
        Action::Manage => vec![OfficerPermission::ApproveKyc],
        Action::Create | Action::Read | Action::Delete => vec![],
    };

    create_policy(
        "kyc-case",
        action,
        PolicyConditions::default()
            .with_any_of_roles([Role::KycOfficer, Role::SystemAdmin])
            .with_verification(VerificationConditions {
                officer_permissions,
                ..VerificationConditions::default()
            }),
    )
}

/// Report cards, scoped to the current school. Anything beyond reading
/// requires the publish permission and a verified KYC.
pub fn report_cards(action: Action) -> AccessPolicy {
    let mut conditions = PolicyConditions::default()
        .with_any_of_roles([Role::Teacher, Role::SchoolAdmin, Role::SchoolOwner])
        .with_school(SchoolConditions {
            must_be_current_school: true,
            allowed_roles: vec![Role::Teacher, Role::SchoolAdmin, Role::SchoolOwner],
            ..SchoolConditions::default()
        });

    if action != Action::Read {
        conditions = conditions
            .with_all_of_permissions([Permission::PublishReports])
            .with_verification(VerificationConditions::require_kyc());
    }

    create_policy("report-cards", action, conditions)
}

/// Grade entry: a grade-recording role acting within the current school.
pub fn grade_entry() -> AccessPolicy {
    create_policy(
        "grades",
        Action::Update,
        PolicyConditions::default()
            .with_any_of_roles([Role::Teacher, Role::SchoolAdmin, Role::SchoolOwner])
            .with_all_of_permissions([Permission::RecordGrades])
            .with_school(SchoolConditions {
                must_be_current_school: true,
                ..SchoolConditions::default()
            }),
    )
}

/// Enrollment management: staff or admins of some school holding the
/// enrollment permission.
pub fn enrollment_management() -> AccessPolicy {
    create_policy(
        "enrollment",
        Action::Manage,
        PolicyConditions::default()
            .with_any_of_roles([Role::SchoolStaff, Role::SchoolAdmin, Role::SchoolOwner])
            .with_all_of_permissions([Permission::ManageEnrollment])
            .with_school(SchoolConditions {
                must_be_in_school: true,
                ..SchoolConditions::default()
            }),
    )
}

/// School administration: requires `SchoolAdmin` standing, resolved
/// hierarchically so owners and platform admins qualify automatically.
pub fn school_administration() -> AccessPolicy {
    create_policy(
        "school-settings",
        Action::Manage,
        PolicyConditions::default()
            .with_any_of_roles([Role::SchoolAdmin])
            .with_school(SchoolConditions {
                must_be_in_school: true,
                ..SchoolConditions::default()
            }),
    )
    .with_role_matching(RoleMatchStrategy::Hierarchical)
}

/// Platform administration: system admins only, from a trusted device,
/// with no active lockout.
pub fn platform_administration() -> AccessPolicy {
    create_policy(
        "platform",
        Action::Manage,
        PolicyConditions::default()
            .with_any_of_roles([Role::SystemAdmin])
            .with_environment(EnvironmentConditions {
                device: Some(DeviceRestrictions {
                    kinds: vec![],
                    require_trusted: true,
                }),
                ..EnvironmentConditions::default()
            })
            .with_custom("account_not_locked", "Account is temporarily locked"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{
        DeviceInfo, DeviceKind, EvaluationContext, KycProfile, SchoolMembership, UserAttributes,
    };
    use crate::evaluator::Evaluator;
    use chrono::{TimeZone, Utc};
    use lyceum_types::EmploymentStatus;

    fn business_hours_ctx() -> EvaluationContext {
        // Wednesday at 10:00 UTC
        EvaluationContext::new().with_now(Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_school_registration_structure() {
        let policy = school_registration();
        assert_eq!(policy.resource, "school");
        assert_eq!(policy.action, Action::Create);
        assert_eq!(policy.role_matching, RoleMatchStrategy::Exact);

        let verification = policy.conditions.verification.as_ref().expect("verification");
        assert!(verification.require_kyc);
        assert_eq!(
            verification.employment_status,
            vec![EmploymentStatus::Eligible]
        );
        assert!(policy.conditions.environment.as_ref().is_some_and(|e| e.time.is_some()));
    }

    #[test]
    fn test_school_registration_requires_everything() {
        let evaluator = Evaluator::default();
        let policy = school_registration();

        let mut user = UserAttributes::new("usr-1", "a@x.example")
            .with_global_role(Role::SchoolAdmin)
            .with_kyc(KycProfile::verified());
        user.employment.status = EmploymentStatus::Eligible;

        let result = evaluator
            .validate_access(&user, &policy, &business_hours_ctx())
            .expect("no predicate faults");
        assert!(result.granted);

        // Same user outside business hours is denied.
        let after_hours =
            EvaluationContext::new().with_now(Utc.with_ymd_and_hms(2025, 1, 8, 22, 0, 0).unwrap());
        let result = evaluator
            .validate_access(&user, &policy, &after_hours)
            .expect("no predicate faults");
        assert!(!result.granted);
    }

    #[test]
    fn test_kyc_verification_scales_with_action() {
        let review = kyc_verification(Action::Update);
        let review_flags = &review.conditions.verification.as_ref().unwrap().officer_permissions;
        assert_eq!(
            review_flags,
            &vec![
                OfficerPermission::VerifyIdentity,
                OfficerPermission::VerifyDocuments
            ]
        );

        let approve = kyc_verification(Action::Manage);
        let approve_flags = &approve.conditions.verification.as_ref().unwrap().officer_permissions;
        assert_eq!(approve_flags, &vec![OfficerPermission::ApproveKyc]);

        let read = kyc_verification(Action::Read);
        assert!(read.conditions.verification.as_ref().unwrap().officer_permissions.is_empty());
    }

    #[test]
    fn test_report_cards_read_vs_publish() {
        let read = report_cards(Action::Read);
        assert!(read.conditions.verification.is_none());
        assert!(read.conditions.all_of.is_none());

        let publish = report_cards(Action::Update);
        assert!(publish.conditions.verification.as_ref().is_some_and(|v| v.require_kyc));
        let all_of = publish.conditions.all_of.as_ref().expect("allOf");
        assert_eq!(all_of.permissions, vec![Permission::PublishReports]);
    }

    #[test]
    fn test_school_administration_is_hierarchical() {
        let policy = school_administration();
        assert_eq!(policy.role_matching, RoleMatchStrategy::Hierarchical);

        // An owner (no explicit SchoolAdmin role) passes via dominance.
        let owner = UserAttributes::new("usr-1", "o@x.example").with_school_membership(
            "sch-1",
            SchoolMembership::new("platform").with_role(Role::SchoolOwner),
        );
        let result = Evaluator::default()
            .validate_access(&owner, &policy, &business_hours_ctx())
            .expect("no predicate faults");
        assert!(result.granted);

        // A teacher does not.
        let teacher = UserAttributes::new("usr-2", "t@x.example").with_school_membership(
            "sch-1",
            SchoolMembership::new("owner").with_role(Role::Teacher),
        );
        let result = Evaluator::default()
            .validate_access(&teacher, &policy, &business_hours_ctx())
            .expect("no predicate faults");
        assert!(!result.granted);
    }

    #[test]
    fn test_platform_administration_checks_device_and_lockout() {
        let evaluator = Evaluator::default();
        let policy = platform_administration();

        let mut admin = UserAttributes::new("usr-1", "ops@x.example")
            .with_global_role(Role::SystemAdmin);

        // No device info => denied.
        let result = evaluator
            .validate_access(&admin, &policy, &business_hours_ctx())
            .expect("builtin predicates resolve");
        assert!(!result.granted);

        // Trusted device => granted.
        admin.context.device =
            Some(DeviceInfo::new("dev-1", DeviceKind::Desktop).with_trust_score(95));
        let result = evaluator
            .validate_access(&admin, &policy, &business_hours_ctx())
            .expect("builtin predicates resolve");
        assert!(result.granted);

        // Locked account => denied with the factory's message.
        let ctx = business_hours_ctx();
        admin.access.locked_until = Some(ctx.resolved_now() + chrono::Duration::minutes(30));
        let result = evaluator
            .validate_access(&admin, &policy, &ctx)
            .expect("builtin predicates resolve");
        assert!(!result.granted);
        assert_eq!(
            result.reason.as_deref(),
            Some("Account is temporarily locked")
        );
    }

    #[test]
    fn test_enrollment_management_requires_membership() {
        let evaluator = Evaluator::default();
        let policy = enrollment_management();

        // Global SchoolStaff role with no membership is rejected by the
        // school group.
        let staff = UserAttributes::new("usr-1", "s@x.example").with_global_role(Role::SchoolStaff);
        let result = evaluator
            .validate_access(&staff, &policy, &business_hours_ctx())
            .expect("no predicate faults");
        assert!(!result.granted);

        let member = UserAttributes::new("usr-2", "s@x.example").with_school_membership(
            "sch-1",
            SchoolMembership::new("admin").with_role(Role::SchoolStaff),
        );
        let result = evaluator
            .validate_access(&member, &policy, &business_hours_ctx())
            .expect("no predicate faults");
        assert!(result.granted);
    }
}
