//! Role definitions and the structural dominance hierarchy.
//!
//! Roles come in two scopes: platform-wide (`SystemAdmin`, `KycOfficer`)
//! and school-scoped (everything else). The same enum is used for both;
//! scoping is a property of where the role is granted (global role set vs.
//! a per-school membership), not of the role itself.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role in the access control system.
///
/// Wire format is SCREAMING_SNAKE_CASE (`"SCHOOL_ADMIN"`), matching the
/// role strings carried in JWT claims and school role grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Enrolled learner.
    ///
    /// **Permissions:**
    /// - View own grades and report cards
    /// - Cannot modify any records
    Student,

    /// Guardian of one or more students.
    ///
    /// **Permissions:**
    /// - View linked students' grades and report cards
    /// - Cannot modify any records
    Parent,

    /// Teaching staff member of a school.
    ///
    /// **Permissions:**
    /// - View and record grades for own classes
    /// - View reports
    ///
    /// **Use Cases:**
    /// - Classroom teachers entering term grades
    /// - Substitute teachers with a scoped assignment
    Teacher,

    /// Non-teaching school staff (front office, registrar).
    ///
    /// **Permissions:**
    /// - Manage enrollment
    /// - View reports
    SchoolStaff,

    /// Platform identity-verification officer.
    ///
    /// **Permissions:**
    /// - Verify identities and documents
    /// - KYC approval requires an explicit officer grant on top of the role
    ///
    /// **Use Cases:**
    /// - Compliance team reviewing teacher onboarding
    KycOfficer,

    /// Administrator of a single school.
    ///
    /// **Permissions:**
    /// - Everything school-scoped: grades, enrollment, staff, reports
    /// - Outranks school staff, teachers, students, and parents
    SchoolAdmin,

    /// Owner of a school.
    ///
    /// **Permissions:**
    /// - Everything a `SchoolAdmin` can do
    /// - Transfer or close the school
    /// - Outranks every other school-scoped role
    SchoolOwner,

    /// Platform operator with unrestricted access.
    ///
    /// **Permissions:**
    /// - Full access to every resource
    /// - Outranks every role
    ///
    /// **Use Cases:**
    /// - Platform operations
    /// - Emergency break-glass access
    SystemAdmin,
}

impl Role {
    /// Returns the roles this role structurally outranks.
    ///
    /// The table is static and total; it does not include the role itself
    /// (dominance is made reflexive by [`Role::dominates`]).
    pub fn dominated_roles(self) -> &'static [Role] {
        match self {
            Role::Student | Role::Parent | Role::Teacher | Role::SchoolStaff | Role::KycOfficer => {
                &[]
            }
            Role::SchoolAdmin => &[
                Role::SchoolStaff,
                Role::Teacher,
                Role::Student,
                Role::Parent,
            ],
            Role::SchoolOwner => &[
                Role::SchoolAdmin,
                Role::SchoolStaff,
                Role::Teacher,
                Role::Student,
                Role::Parent,
            ],
            Role::SystemAdmin => &[
                Role::SchoolOwner,
                Role::SchoolAdmin,
                Role::SchoolStaff,
                Role::Teacher,
                Role::Student,
                Role::Parent,
                Role::KycOfficer,
            ],
        }
    }

    /// Returns whether this role satisfies a requirement for `other`.
    ///
    /// Dominance is reflexive: every role dominates itself.
    pub fn dominates(self, other: Role) -> bool {
        self == other || self.dominated_roles().contains(&other)
    }

    /// Returns whether this role is platform-wide rather than school-scoped.
    pub fn is_platform_role(self) -> bool {
        matches!(self, Role::SystemAdmin | Role::KycOfficer)
    }

    /// Returns the canonical wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Parent => "PARENT",
            Role::Teacher => "TEACHER",
            Role::SchoolStaff => "SCHOOL_STAFF",
            Role::KycOfficer => "KYC_OFFICER",
            Role::SchoolAdmin => "SCHOOL_ADMIN",
            Role::SchoolOwner => "SCHOOL_OWNER",
            Role::SystemAdmin => "SYSTEM_ADMIN",
        }
    }

    /// All roles, for table-totality checks and property tests.
    pub const ALL: [Role; 8] = [
        Role::Student,
        Role::Parent,
        Role::Teacher,
        Role::SchoolStaff,
        Role::KycOfficer,
        Role::SchoolAdmin,
        Role::SchoolOwner,
        Role::SystemAdmin,
    ];
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a role string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    /// Parses a role from its wire name, case-insensitively.
    ///
    /// Accepts `"SCHOOL_ADMIN"`, `"school_admin"`, etc. Token issuers are
    /// not consistent about casing, so parsing is lenient; serialization is
    /// always canonical.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "PARENT" => Ok(Role::Parent),
            "TEACHER" => Ok(Role::Teacher),
            "SCHOOL_STAFF" => Ok(Role::SchoolStaff),
            "KYC_OFFICER" => Ok(Role::KycOfficer),
            "SCHOOL_ADMIN" => Ok(Role::SchoolAdmin),
            "SCHOOL_OWNER" => Ok(Role::SchoolOwner),
            "SYSTEM_ADMIN" => Ok(Role::SystemAdmin),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}
