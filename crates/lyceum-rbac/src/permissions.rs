//! Permission types for access control.
//!
//! Defines fine-grained permissions that can be granted to roles globally
//! (via the role → permission table) or per school (via a membership grant).

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::roles::RoleParseError;

/// Permission that can be granted to a role or a school membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// View grades.
    ViewGrades,

    /// Enter or amend grades.
    RecordGrades,

    /// Enroll, transfer, or withdraw students.
    ManageEnrollment,

    /// Hire, assign, or remove school staff.
    ///
    /// **Security Impact:**
    /// - High-risk permission (staff assignments grant further access)
    ManageStaff,

    /// Change school settings, branding, and configuration.
    ManageSchool,

    /// Verify a user's identity documents (KYC step 1).
    VerifyIdentity,

    /// Verify supporting documents (KYC step 2).
    VerifyDocuments,

    /// Give final approval to a KYC case.
    ///
    /// **Security Impact:**
    /// - High-risk permission (approval unlocks employment at schools)
    /// - Requires an explicit officer grant, never implied by role alone
    ApproveKyc,

    /// View report cards and aggregate reports.
    ViewReports,

    /// Publish report cards to students and parents.
    PublishReports,

    /// Operate the platform itself (feature flags, school lifecycle).
    ///
    /// **Security Impact:**
    /// - High-risk permission, restricted to `SystemAdmin`
    ManagePlatform,
}

impl Permission {
    /// Returns whether this permission is high-risk.
    ///
    /// High-risk permissions can escalate further access and get extra
    /// scrutiny in policy reviews.
    pub fn is_high_risk(self) -> bool {
        matches!(
            self,
            Permission::ManageStaff | Permission::ApproveKyc | Permission::ManagePlatform
        )
    }

    /// Returns the canonical wire name of the permission.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::ViewGrades => "VIEW_GRADES",
            Permission::RecordGrades => "RECORD_GRADES",
            Permission::ManageEnrollment => "MANAGE_ENROLLMENT",
            Permission::ManageStaff => "MANAGE_STAFF",
            Permission::ManageSchool => "MANAGE_SCHOOL",
            Permission::VerifyIdentity => "VERIFY_IDENTITY",
            Permission::VerifyDocuments => "VERIFY_DOCUMENTS",
            Permission::ApproveKyc => "APPROVE_KYC",
            Permission::ViewReports => "VIEW_REPORTS",
            Permission::PublishReports => "PUBLISH_REPORTS",
            Permission::ManagePlatform => "MANAGE_PLATFORM",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = RoleParseError;

    /// Parses a permission from its wire name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VIEW_GRADES" => Ok(Permission::ViewGrades),
            "RECORD_GRADES" => Ok(Permission::RecordGrades),
            "MANAGE_ENROLLMENT" => Ok(Permission::ManageEnrollment),
            "MANAGE_STAFF" => Ok(Permission::ManageStaff),
            "MANAGE_SCHOOL" => Ok(Permission::ManageSchool),
            "VERIFY_IDENTITY" => Ok(Permission::VerifyIdentity),
            "VERIFY_DOCUMENTS" => Ok(Permission::VerifyDocuments),
            "APPROVE_KYC" => Ok(Permission::ApproveKyc),
            "VIEW_REPORTS" => Ok(Permission::ViewReports),
            "PUBLISH_REPORTS" => Ok(Permission::PublishReports),
            "MANAGE_PLATFORM" => Ok(Permission::ManagePlatform),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

/// Set of permissions granted to a role or membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: Vec<Permission>,
}

impl PermissionSet {
    /// Creates a new permission set, dropping duplicates.
    pub fn new(permissions: Vec<Permission>) -> Self {
        let mut set = Self::empty();
        for permission in permissions {
            set.grant(permission);
        }
        set
    }

    /// Creates an empty permission set.
    pub fn empty() -> Self {
        Self {
            permissions: Vec::new(),
        }
    }

    /// Returns whether this set contains the given permission.
    pub fn contains(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Adds a permission to the set.
    pub fn grant(&mut self, permission: Permission) {
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
    }

    /// Removes a permission from the set.
    pub fn revoke(&mut self, permission: Permission) {
        self.permissions.retain(|p| *p != permission);
    }

    /// Merges another set into this one.
    pub fn extend(&mut self, other: &PermissionSet) {
        for permission in &other.permissions {
            self.grant(*permission);
        }
    }

    /// Returns all permissions in the set.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Returns the number of permissions in the set.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Returns whether any permission in the set is high-risk.
    pub fn has_high_risk_permission(&self) -> bool {
        self.permissions.iter().any(|p| p.is_high_risk())
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        Self::new(permissions)
    }
}
