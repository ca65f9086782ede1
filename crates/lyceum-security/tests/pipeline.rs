//! End-to-end pipeline tests: token → authentication → cached ABAC
//! evaluation → decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lyceum_abac::attributes::KycProfile;
use lyceum_abac::policy::{PolicyConditions, VerificationConditions, create_policy};
use lyceum_abac::{DecisionCache, Evaluator, PredicateRegistry, UserAttributes};
use lyceum_rbac::Role;
use lyceum_security::{
    AttributeSource, AuthService, BasicAuthConfig, JwtConfig, RequestContext, SecurityError,
    SecurityLayer, SecurityPipeline, SecurityResult,
};
use lyceum_types::{Action, UserId};

const SECRET: &str = "integration-test-secret-key";

fn auth_service() -> AuthService {
    AuthService::new(JwtConfig::new(SECRET))
}

/// Attribute source returning a fixed enriched subject.
struct FixedAttributes(UserAttributes);

impl AttributeSource for FixedAttributes {
    fn collect(
        &self,
        _user_id: &UserId,
        _request: &RequestContext,
    ) -> SecurityResult<UserAttributes> {
        Ok(self.0.clone())
    }
}

/// Pipeline plus the spy counter wired into its `spy` predicate.
fn spy_pipeline(cache_ttl_secs: u64) -> (SecurityPipeline, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut registry = PredicateRegistry::with_builtins();
    registry.register("spy", move |_user, _ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });

    let pipeline = SecurityPipeline::new(
        auth_service(),
        Arc::new(Evaluator::new(registry)),
        Arc::new(DecisionCache::new(
            std::time::Duration::from_secs(cache_ttl_secs),
            64,
        )),
    );
    (pipeline, calls)
}

fn verified_teacher() -> UserAttributes {
    UserAttributes::new("usr-1", "teacher@school.example")
        .with_global_role(Role::Teacher)
        .with_kyc(KycProfile::verified())
}

fn grades_layer() -> SecurityLayer {
    SecurityLayer::authenticated().with_policy(create_policy(
        "grades",
        Action::Read,
        PolicyConditions::default()
            .with_any_of_roles([Role::Teacher])
            .with_verification(VerificationConditions::require_kyc())
            .with_custom("spy", "spy denied"),
    ))
}

fn teacher_request() -> RequestContext {
    let token = auth_service()
        .issue_token("usr-1", "teacher@school.example", Role::Teacher, vec![])
        .expect("issue token");
    RequestContext::new().with_bearer_token(token)
}

#[test]
fn grant_end_to_end() {
    let (pipeline, _calls) = spy_pipeline(5);
    let pipeline =
        pipeline.with_attribute_source(Arc::new(FixedAttributes(verified_teacher())));

    let authorized = pipeline
        .authorize(&grades_layer(), &teacher_request())
        .expect("verified teacher is granted");

    let claims = authorized.claims.expect("claims populated");
    assert_eq!(claims.sub, "usr-1");
    let attributes = authorized.attributes.expect("attributes populated");
    assert!(attributes.kyc.status.is_verified());
}

#[test]
fn missing_token_is_auth_error_before_evaluation() {
    let (pipeline, calls) = spy_pipeline(5);

    let err = pipeline
        .authorize(&grades_layer(), &RequestContext::new())
        .expect_err("missing token must fail");

    assert!(matches!(err, SecurityError::MissingToken));
    assert_eq!(err.status_code(), 401);
    assert_eq!(calls.load(Ordering::SeqCst), 0, "evaluator must not run");
}

#[test]
fn tampered_token_is_rejected() {
    let (pipeline, _calls) = spy_pipeline(5);
    let other_issuer = AuthService::new(JwtConfig::new("a-different-secret"));
    let token = other_issuer
        .issue_token("usr-1", "t@x.example", Role::Teacher, vec![])
        .expect("issue token");

    let err = pipeline
        .authorize(
            &grades_layer(),
            &RequestContext::new().with_bearer_token(token),
        )
        .expect_err("foreign signature must fail");
    assert!(matches!(err, SecurityError::InvalidToken { .. }));
}

#[test]
fn basic_auth_rejects_before_evaluation() {
    let (pipeline, calls) = spy_pipeline(5);
    let layer = grades_layer().with_basic_auth(BasicAuthConfig {
        roles: vec![Role::SystemAdmin],
        permissions: vec![],
    });

    let err = pipeline
        .authorize(&layer, &teacher_request())
        .expect_err("teacher token must be rejected by basic auth");

    assert!(matches!(err, SecurityError::CredentialsRejected { .. }));
    assert_eq!(err.status_code(), 403);
    assert_eq!(
        calls.load(Ordering::SeqCst),
        0,
        "cheap rejection must happen before the evaluator runs"
    );
}

#[test]
fn denial_carries_reason_resource_and_action() {
    // No attribute source: the skeleton has an unverified KYC.
    let (pipeline, _calls) = spy_pipeline(5);

    let err = pipeline
        .authorize(&grades_layer(), &teacher_request())
        .expect_err("unverified skeleton must be denied");

    match err {
        SecurityError::Forbidden {
            reason,
            resource,
            action,
        } => {
            assert_eq!(reason, "KYC verification required");
            assert_eq!(resource, "grades");
            assert_eq!(action, Action::Read);
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[test]
fn cache_suppresses_reevaluation() {
    let (pipeline, calls) = spy_pipeline(60);
    let pipeline =
        pipeline.with_attribute_source(Arc::new(FixedAttributes(verified_teacher())));
    let layer = grades_layer();
    let request = teacher_request();

    let first = pipeline.authorize(&layer, &request).expect("first grant");
    let second = pipeline.authorize(&layer, &request).expect("second grant");

    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "second evaluation must be served from the cache"
    );
    assert_eq!(
        first.attributes.expect("attrs").id,
        second.attributes.expect("attrs").id
    );
}

#[test]
fn subject_invalidation_forces_reevaluation() {
    let (pipeline, calls) = spy_pipeline(60);
    let pipeline =
        pipeline.with_attribute_source(Arc::new(FixedAttributes(verified_teacher())));
    let layer = grades_layer();
    let request = teacher_request();

    pipeline.authorize(&layer, &request).expect("grant");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Attribute mutation event for this subject (e.g. KYC state change).
    pipeline.cache().invalidate_subject(&UserId::from("usr-1"));

    pipeline.authorize(&layer, &request).expect("grant");
    assert_eq!(
        calls.load(Ordering::SeqCst),
        2,
        "invalidation must force a fresh evaluation"
    );
}

#[test]
fn cached_denial_is_returned_without_reevaluation() {
    // Skeleton subject (unverified) is denied; the denial itself is cached.
    let (pipeline, _calls) = spy_pipeline(60);
    let layer = grades_layer();
    let request = teacher_request();

    let first = pipeline.authorize(&layer, &request).expect_err("denied");
    let second = pipeline.authorize(&layer, &request).expect_err("denied");

    for err in [first, second] {
        assert!(matches!(err, SecurityError::Forbidden { .. }));
    }
}

#[test]
fn public_route_passes_without_token() {
    let (pipeline, _calls) = spy_pipeline(5);

    let authorized = pipeline
        .authorize(&SecurityLayer::public(), &RequestContext::new())
        .expect("public route");

    assert!(authorized.claims.is_none());
    assert!(authorized.attributes.is_none());
}

#[test]
fn public_route_still_verifies_a_presented_token() {
    let (pipeline, _calls) = spy_pipeline(5);

    let err = pipeline
        .authorize(
            &SecurityLayer::public(),
            &RequestContext::new().with_bearer_token("garbage"),
        )
        .expect_err("a presented token must still verify");
    assert!(matches!(err, SecurityError::InvalidToken { .. }));
}

#[test]
fn route_without_policy_only_authenticates() {
    let (pipeline, calls) = spy_pipeline(5);

    let authorized = pipeline
        .authorize(&SecurityLayer::authenticated(), &teacher_request())
        .expect("token-only route");

    assert!(authorized.claims.is_some());
    assert!(authorized.attributes.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn interceptor_enforces_its_layer() {
    let (pipeline, _calls) = spy_pipeline(5);
    let pipeline =
        pipeline.with_attribute_source(Arc::new(FixedAttributes(verified_teacher())));

    let intercept = Arc::new(pipeline).interceptor(grades_layer());

    intercept(&teacher_request()).expect("verified teacher is granted");
    let err = intercept(&RequestContext::new()).expect_err("missing token");
    assert!(matches!(err, SecurityError::MissingToken));
}

#[test]
fn pipeline_built_from_config_verifies_tokens() {
    let mut config = lyceum_security::SecurityConfig::default();
    config.jwt.secret = SECRET.to_string();

    let pipeline = config.build_pipeline(Arc::new(Evaluator::default()));
    let authorized = pipeline
        .authorize(&SecurityLayer::authenticated(), &teacher_request())
        .expect("config-built pipeline verifies tokens");
    assert!(authorized.claims.is_some());
}

#[test]
fn current_school_header_reaches_the_evaluator() {
    use lyceum_abac::policy::SchoolConditions;

    let (pipeline, _calls) = spy_pipeline(5);
    let pipeline =
        pipeline.with_attribute_source(Arc::new(FixedAttributes(verified_teacher())));

    let layer = SecurityLayer::authenticated().with_policy(create_policy(
        "report-cards",
        Action::Read,
        PolicyConditions::default().with_school(SchoolConditions {
            must_be_current_school: true,
            ..SchoolConditions::default()
        }),
    ));

    // Without the header the school group fails.
    let err = pipeline
        .authorize(&layer, &teacher_request())
        .expect_err("no school context");
    match err {
        SecurityError::Forbidden { reason, .. } => {
            assert_eq!(reason, "No current school context");
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }

    // With the header the same subject is granted.
    let request = teacher_request().with_header("x-school-id", "sch-1");
    pipeline
        .authorize(&layer, &request)
        .expect("header supplies the school context");
}
