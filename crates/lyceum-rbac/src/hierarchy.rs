//! Role → permission table and permission flattening.
//!
//! The table is static and total: every role has an entry. Permission
//! conditions in ABAC policies resolve against the union of the subject's
//! role-derived permissions and any explicit per-school grants.

use crate::permissions::{Permission, PermissionSet};
use crate::roles::Role;

/// Returns the permissions a role carries by itself.
///
/// These are baseline grants; a school membership can add explicit
/// permissions on top (e.g. a `Teacher` additionally granted
/// `MANAGE_ENROLLMENT` at one school).
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Student | Role::Parent => &[Permission::ViewGrades, Permission::ViewReports],
        Role::Teacher => &[
            Permission::ViewGrades,
            Permission::RecordGrades,
            Permission::ViewReports,
        ],
        Role::SchoolStaff => &[Permission::ManageEnrollment, Permission::ViewReports],
        // Final KYC approval requires an explicit officer grant.
        Role::KycOfficer => &[Permission::VerifyIdentity, Permission::VerifyDocuments],
        Role::SchoolAdmin | Role::SchoolOwner => &[
            Permission::ViewGrades,
            Permission::RecordGrades,
            Permission::ManageEnrollment,
            Permission::ManageStaff,
            Permission::ManageSchool,
            Permission::ViewReports,
            Permission::PublishReports,
        ],
        Role::SystemAdmin => &[
            Permission::ViewGrades,
            Permission::RecordGrades,
            Permission::ManageEnrollment,
            Permission::ManageStaff,
            Permission::ManageSchool,
            Permission::VerifyIdentity,
            Permission::VerifyDocuments,
            Permission::ApproveKyc,
            Permission::ViewReports,
            Permission::PublishReports,
            Permission::ManagePlatform,
        ],
    }
}

/// Flattens a set of roles into the union of their permissions.
pub fn flatten_permissions<I>(roles: I) -> PermissionSet
where
    I: IntoIterator<Item = Role>,
{
    let mut set = PermissionSet::empty();
    for role in roles {
        for permission in role_permissions(role) {
            set.grant(*permission);
        }
    }
    set
}
