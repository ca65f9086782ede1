//! # lyceum-rbac: Role and Permission Registry
//!
//! Static role and permission tables for the Lyceum platform:
//! - **Roles** with a structural dominance hierarchy (a `SchoolAdmin`
//!   outranks a `Teacher`; a `SystemAdmin` outranks everyone)
//! - **Permissions** with duplicate-free grant sets
//! - **Role → permission** mapping and permission flattening
//!
//! The tables are pure data: no I/O, no mutation, total over every role.
//! The ABAC engine consults them for hierarchy-aware role matching and for
//! resolving `allOf`/`anyOf` permission conditions.
//!
//! ## Roles
//!
//! | Role        | Scope    | Outranks                                        |
//! |-------------|----------|-------------------------------------------------|
//! | Student     | school   | —                                               |
//! | Parent      | school   | —                                               |
//! | Teacher     | school   | —                                               |
//! | SchoolStaff | school   | —                                               |
//! | KycOfficer  | platform | —                                               |
//! | SchoolAdmin | school   | SchoolStaff, Teacher, Student, Parent           |
//! | SchoolOwner | school   | SchoolAdmin and below                           |
//! | SystemAdmin | platform | everyone                                        |

pub mod hierarchy;
pub mod permissions;
pub mod roles;

// Re-export commonly used types
pub use hierarchy::{flatten_permissions, role_permissions};
pub use permissions::{Permission, PermissionSet};
pub use roles::{Role, RoleParseError};
