//! The two-stage security pipeline.
//!
//! Stage 1 (authentication, fast path): verify the bearer token and apply
//! the route's coarse basic-auth check against the claims. Failures
//! short-circuit; the ABAC evaluators never run.
//!
//! Stage 2 (ABAC): when the route carries a policy, enrich the subject's
//! attributes (through the attribute-collection collaborator, falling back
//! to the token skeleton), consult the decision cache, and evaluate on a
//! miss. A denial becomes a 403-class [`SecurityError::Forbidden`] carrying
//! the evaluator's reason plus the policy's resource and action.
//!
//! The pipeline is synchronous and performs no I/O of its own; it is safe
//! to share across request tasks behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use lyceum_abac::attributes::{DeviceInfo, DeviceKind, LocationInfo, RequestAttributes};
use lyceum_abac::{DecisionCache, EvaluationContext, Evaluator, UserAttributes};
use lyceum_types::{SchoolId, UserId};

use crate::auth::{AuthService, TokenClaims};
use crate::error::{SecurityError, SecurityResult};
use crate::layer::{BasicAuthConfig, SecurityLayer};

/// Header carrying the school the request acts within.
pub const SCHOOL_ID_HEADER: &str = "x-school-id";
/// Header carrying the client device identifier.
pub const DEVICE_ID_HEADER: &str = "x-device-id";
/// Header carrying the client device classification.
pub const DEVICE_TYPE_HEADER: &str = "x-device-type";

// ============================================================================
// Request context
// ============================================================================

/// The slice of an incoming request the pipeline consumes.
///
/// Host-framework adapters build one of these from the real request; the
/// pipeline itself never touches the framework's types.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub bearer_token: Option<String>,
    /// Headers, keyed lowercase.
    headers: HashMap<String, String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Adds a header (name is matched case-insensitively).
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the client IP.
    #[must_use]
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Looks up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The school the request acts within, from `x-school-id`.
    pub fn school_id(&self) -> Option<SchoolId> {
        self.header(SCHOOL_ID_HEADER).map(SchoolId::from)
    }

    /// The device id, from `x-device-id`.
    pub fn device_id(&self) -> Option<&str> {
        self.header(DEVICE_ID_HEADER)
    }

    /// The device kind, from `x-device-type`.
    pub fn device_kind(&self) -> Option<DeviceKind> {
        self.header(DEVICE_TYPE_HEADER).map(parse_device_kind)
    }
}

/// Maps an `x-device-type` header value onto a device kind.
fn parse_device_kind(value: &str) -> DeviceKind {
    match value.to_ascii_uppercase().as_str() {
        "DESKTOP" => DeviceKind::Desktop,
        "MOBILE" => DeviceKind::Mobile,
        "TABLET" => DeviceKind::Tablet,
        "SERVER" => DeviceKind::Server,
        _ => DeviceKind::Unknown,
    }
}

// ============================================================================
// Attribute collection boundary
// ============================================================================

/// The attribute-collection collaborator.
///
/// Given a user id and the request context, returns fully enriched
/// [`UserAttributes`] (typically from a per-service cache or the database).
/// The pipeline consumes the result; it never produces attributes itself
/// beyond the token skeleton fallback.
pub trait AttributeSource: Send + Sync {
    fn collect(&self, user_id: &UserId, request: &RequestContext)
    -> SecurityResult<UserAttributes>;
}

// ============================================================================
// Authorized request
// ============================================================================

/// The outcome of a successful pass through the pipeline.
#[derive(Debug, Clone)]
pub struct AuthorizedRequest {
    /// Verified token claims; `None` for anonymous access to public routes.
    pub claims: Option<TokenClaims>,
    /// Enriched subject attributes; populated only when a policy ran.
    pub attributes: Option<UserAttributes>,
}

impl AuthorizedRequest {
    fn anonymous() -> Self {
        Self {
            claims: None,
            attributes: None,
        }
    }
}

// ============================================================================
// SecurityPipeline
// ============================================================================

/// The security middleware: authentication plus cached ABAC evaluation.
///
/// Constructed once per service with its collaborators injected, then
/// consulted for every protected request.
pub struct SecurityPipeline {
    auth: AuthService,
    evaluator: Arc<Evaluator>,
    cache: Arc<DecisionCache>,
    attributes: Option<Arc<dyn AttributeSource>>,
}

impl SecurityPipeline {
    /// Creates a pipeline over the given collaborators.
    pub fn new(auth: AuthService, evaluator: Arc<Evaluator>, cache: Arc<DecisionCache>) -> Self {
        Self {
            auth,
            evaluator,
            cache,
            attributes: None,
        }
    }

    /// Injects the attribute-collection collaborator. Without one, stage 2
    /// evaluates against the token skeleton only.
    #[must_use]
    pub fn with_attribute_source(mut self, source: Arc<dyn AttributeSource>) -> Self {
        self.attributes = Some(source);
        self
    }

    /// The decision cache, for invalidation hooks.
    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }

    /// Produces a request interceptor enforcing one route's layer.
    ///
    /// Host frameworks that register middleware as callables can mount the
    /// returned closure directly; it owns its pipeline handle and layer.
    pub fn interceptor(
        self: Arc<Self>,
        layer: SecurityLayer,
    ) -> impl Fn(&RequestContext) -> SecurityResult<AuthorizedRequest> {
        move |request| self.authorize(&layer, request)
    }

    /// Runs the two-stage pipeline for one request.
    pub fn authorize(
        &self,
        layer: &SecurityLayer,
        request: &RequestContext,
    ) -> SecurityResult<AuthorizedRequest> {
        // Stage 1: authentication.
        if !layer.authentication.required && request.bearer_token.is_none() {
            return Ok(AuthorizedRequest::anonymous());
        }

        let claims = self.auth.verify_token(request.bearer_token.as_deref())?;

        if let Some(basic_auth) = &layer.authentication.basic_auth {
            check_basic_auth(basic_auth, &claims)?;
        }

        // Stage 2: ABAC evaluation.
        let Some(policy) = &layer.policy else {
            return Ok(AuthorizedRequest {
                claims: Some(claims),
                attributes: None,
            });
        };

        let user_id = UserId::from(claims.sub.as_str());
        let user = match &self.attributes {
            Some(source) => source.collect(&user_id, request)?,
            None => skeleton_with_request_context(&claims, request),
        };

        let current_school = request.school_id();
        let key = DecisionCache::cache_key(&user.id, policy, current_school.as_ref());
        let decision = match self.cache.get(&key) {
            Some(decision) => decision,
            None => {
                let mut ctx = EvaluationContext::new();
                if let Some(school) = current_school {
                    ctx = ctx.with_current_school(school);
                }
                let decision = self.evaluator.validate_access(&user, policy, &ctx)?;
                self.cache.put(key, decision.clone());
                decision
            }
        };

        if !decision.granted {
            let reason = decision
                .reason
                .unwrap_or_else(|| "Access denied".to_string());
            warn!(
                subject = %user.id,
                resource = %policy.resource,
                action = %policy.action,
                %reason,
                "request denied by policy"
            );
            return Err(SecurityError::Forbidden {
                reason,
                resource: policy.resource.clone(),
                action: policy.action,
            });
        }

        info!(
            subject = %user.id,
            resource = %policy.resource,
            action = %policy.action,
            "request authorized"
        );
        Ok(AuthorizedRequest {
            claims: Some(claims),
            attributes: Some(user),
        })
    }
}

/// Checks the coarse basic-auth requirements against token claims.
fn check_basic_auth(config: &BasicAuthConfig, claims: &TokenClaims) -> SecurityResult<()> {
    if !config.roles.is_empty() {
        let permitted = claims
            .parsed_role()
            .is_some_and(|role| config.roles.contains(&role));
        if !permitted {
            return Err(SecurityError::CredentialsRejected {
                detail: format!("role '{}' is not permitted for this route", claims.role),
            });
        }
    }

    if !config.permissions.is_empty() {
        let held: Vec<lyceum_rbac::Permission> = claims
            .permissions
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect();
        let permitted = config.permissions.iter().all(|p| held.contains(p));
        if !permitted {
            return Err(SecurityError::CredentialsRejected {
                detail: "token permissions are not sufficient for this route".to_string(),
            });
        }
    }

    Ok(())
}

/// Builds the skeleton subject and attaches the request-derived context
/// attributes (school header, device headers, client IP).
fn skeleton_with_request_context(
    claims: &TokenClaims,
    request: &RequestContext,
) -> UserAttributes {
    let device = request.device_id().map(|id| {
        DeviceInfo::new(id, request.device_kind().unwrap_or(DeviceKind::Unknown))
    });
    let location = request
        .client_ip
        .as_deref()
        .map(LocationInfo::new);

    claims.skeleton_attributes().with_context(RequestAttributes {
        current_school_id: request.school_id(),
        current_role: claims.parsed_role(),
        device,
        location,
    })
}
