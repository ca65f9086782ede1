//! Named predicate registry for custom policy conditions.
//!
//! Policies reference predicates by name (see
//! [`crate::policy::CustomCondition`]); the executable implementations are
//! registered here once at startup. Lookups of unknown names fail closed at
//! evaluation time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attributes::{EvaluationContext, UserAttributes};

/// A predicate implementation.
///
/// Returns `Ok(true)` to pass, `Ok(false)` to deny with the condition's
/// configured message, or `Err(detail)` for an internal failure (which
/// denies, never grants).
pub type PredicateFn =
    dyn Fn(&UserAttributes, &EvaluationContext) -> Result<bool, String> + Send + Sync;

/// Registry of named, statically-typed predicate implementations.
///
/// Built once and shared behind an `Arc` by every evaluator; registration
/// happens at construction time, lookups afterwards are read-only.
pub struct PredicateRegistry {
    predicates: HashMap<String, Arc<PredicateFn>>,
}

impl PredicateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            predicates: HashMap::new(),
        }
    }

    /// Creates a registry populated with the platform's built-in predicates.
    ///
    /// Built-ins:
    /// - `account_not_locked` — the account has no active lockout window
    /// - `social_login_enabled` — the account allows social sign-in
    /// - `kyc_documents_on_file` — at least one KYC document is attached
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("account_not_locked", |user, ctx| {
            Ok(!user.access.is_locked(ctx.resolved_now()))
        });
        registry.register("social_login_enabled", |user, _ctx| {
            Ok(user.access.social_enabled)
        });
        registry.register("kyc_documents_on_file", |user, _ctx| {
            Ok(!user.kyc.document_ids.is_empty())
        });
        registry
    }

    /// Registers a predicate under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&UserAttributes, &EvaluationContext) -> Result<bool, String>
            + Send
            + Sync
            + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    /// Looks up a predicate by name.
    pub fn get(&self, name: &str) -> Option<Arc<PredicateFn>> {
        self.predicates.get(name).cloned()
    }

    /// Returns whether a predicate is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Returns the registered predicate names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    /// Returns the number of registered predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("names", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_empty_registry() {
        let registry = PredicateRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("anything").is_none());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = PredicateRegistry::new();
        registry.register("always_true", |_user, _ctx| Ok(true));

        assert!(registry.contains("always_true"));
        let predicate = registry.get("always_true").expect("registered");
        let user = UserAttributes::new("usr-1", "u@x.example");
        assert_eq!(predicate(&user, &EvaluationContext::default()), Ok(true));
    }

    #[test]
    fn test_registration_replaces() {
        let mut registry = PredicateRegistry::new();
        registry.register("p", |_u, _c| Ok(true));
        registry.register("p", |_u, _c| Ok(false));
        assert_eq!(registry.len(), 1);

        let predicate = registry.get("p").expect("registered");
        let user = UserAttributes::new("usr-1", "u@x.example");
        assert_eq!(predicate(&user, &EvaluationContext::default()), Ok(false));
    }

    #[test]
    fn test_builtin_account_not_locked() {
        let registry = PredicateRegistry::with_builtins();
        let predicate = registry.get("account_not_locked").expect("builtin");

        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let ctx = EvaluationContext::new().with_now(now);

        let mut user = UserAttributes::new("usr-1", "u@x.example");
        assert_eq!(predicate(&user, &ctx), Ok(true));

        user.access.locked_until = Some(now + Duration::minutes(5));
        assert_eq!(predicate(&user, &ctx), Ok(false));

        user.access.locked_until = Some(now - Duration::minutes(5));
        assert_eq!(predicate(&user, &ctx), Ok(true));
    }

    #[test]
    fn test_builtin_social_login_enabled() {
        let registry = PredicateRegistry::with_builtins();
        let predicate = registry.get("social_login_enabled").expect("builtin");

        let mut user = UserAttributes::new("usr-1", "u@x.example");
        assert_eq!(predicate(&user, &EvaluationContext::default()), Ok(false));

        user.access.social_enabled = true;
        assert_eq!(predicate(&user, &EvaluationContext::default()), Ok(true));
    }

    #[test]
    fn test_builtin_kyc_documents_on_file() {
        let registry = PredicateRegistry::with_builtins();
        let predicate = registry.get("kyc_documents_on_file").expect("builtin");

        let mut user = UserAttributes::new("usr-1", "u@x.example");
        assert_eq!(predicate(&user, &EvaluationContext::default()), Ok(false));

        user.kyc.document_ids.push("doc-1".to_string());
        assert_eq!(predicate(&user, &EvaluationContext::default()), Ok(true));
    }
}
