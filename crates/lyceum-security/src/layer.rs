//! Per-route security configuration.
//!
//! A [`SecurityLayer`] describes what the pipeline enforces for one route:
//! whether authentication is required, an optional coarse role/permission
//! check against token claims (cheap rejection before attribute
//! enrichment), and an optional ABAC policy for full evaluation.

use serde::{Deserialize, Serialize};

use lyceum_abac::AccessPolicy;
use lyceum_rbac::{Permission, Role};

/// Coarse role/permission requirements checked directly against token
/// claims in the authentication stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    /// The token's role must be one of these, when non-empty.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// The token must carry all of these permissions, when non-empty.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Authentication requirements for a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    /// Whether a bearer token is required at all.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Optional coarse check against the token's claims.
    #[serde(default)]
    pub basic_auth: Option<BasicAuthConfig>,
}

fn default_required() -> bool {
    true
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            required: true,
            basic_auth: None,
        }
    }
}

/// The full security configuration of one route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityLayer {
    #[serde(default)]
    pub authentication: AuthenticationConfig,
    /// ABAC policy evaluated after authentication, when present.
    #[serde(default)]
    pub policy: Option<AccessPolicy>,
}

impl SecurityLayer {
    /// A route requiring only a valid token.
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// A route open to unauthenticated requests.
    pub fn public() -> Self {
        Self {
            authentication: AuthenticationConfig {
                required: false,
                basic_auth: None,
            },
            policy: None,
        }
    }

    /// Adds a coarse role/permission check (builder pattern).
    #[must_use]
    pub fn with_basic_auth(mut self, basic_auth: BasicAuthConfig) -> Self {
        self.authentication.basic_auth = Some(basic_auth);
        self
    }

    /// Attaches an ABAC policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyceum_abac::policy::{PolicyConditions, create_policy};
    use lyceum_types::Action;

    #[test]
    fn test_default_requires_authentication() {
        let layer = SecurityLayer::authenticated();
        assert!(layer.authentication.required);
        assert!(layer.authentication.basic_auth.is_none());
        assert!(layer.policy.is_none());
    }

    #[test]
    fn test_public_layer() {
        let layer = SecurityLayer::public();
        assert!(!layer.authentication.required);
    }

    #[test]
    fn test_builder() {
        let layer = SecurityLayer::authenticated()
            .with_basic_auth(BasicAuthConfig {
                roles: vec![Role::SystemAdmin],
                permissions: vec![Permission::ManagePlatform],
            })
            .with_policy(create_policy(
                "platform",
                Action::Manage,
                PolicyConditions::default(),
            ));

        let basic = layer.authentication.basic_auth.as_ref().expect("basic auth");
        assert_eq!(basic.roles, vec![Role::SystemAdmin]);
        assert!(layer.policy.is_some());
    }

    #[test]
    fn test_layer_deserializes_with_defaults() {
        // A route table entry that only names a policy resource still gets
        // `required: true`.
        let layer: SecurityLayer = serde_json::from_str(
            r#"{"policy": {"resource": "grades", "action": "READ"}}"#,
        )
        .expect("deserialize layer");
        assert!(layer.authentication.required);
        let policy = layer.policy.expect("policy");
        assert_eq!(policy.resource, "grades");
        assert_eq!(policy.action, Action::Read);
    }
}
