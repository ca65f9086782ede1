//! Token verification for the fast authentication stage.
//!
//! Verifies bearer tokens (HS256 JWTs with issuer/audience validation) and
//! extracts the claims the pipeline needs. The token format itself is owned
//! by the auth service; this module only consumes it. Token issuance is
//! provided for service-to-service use and tests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use lyceum_abac::UserAttributes;
use lyceum_rbac::Role;

use crate::error::{SecurityError, SecurityResult};

// ============================================================================
// JWT configuration
// ============================================================================

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing/verifying tokens.
    secret: String,
    /// Token expiration duration.
    pub expiration: Duration,
    /// Issuer claim.
    pub issuer: String,
    /// Audience claims.
    pub audience: Vec<String>,
}

impl JwtConfig {
    /// Creates a new JWT configuration.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration: Duration::from_secs(3600), // 1 hour
            issuer: "lyceum".to_string(),
            audience: vec!["lyceum".to_string()],
        }
    }

    /// Sets the token expiration duration.
    #[must_use]
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Adds an audience claim.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.push(audience.into());
        self
    }

    /// Replaces the audience claims.
    #[must_use]
    pub fn with_audiences(mut self, audience: Vec<String>) -> Self {
        self.audience = audience;
        self
    }
}

// ============================================================================
// Claims
// ============================================================================

/// JWT claims carried by platform tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id).
    pub sub: String,
    /// Account email.
    pub email: String,
    /// Primary role, as a wire-format role name.
    pub role: String,
    /// Coarse permission names granted at login time.
    pub permissions: Vec<String>,
    /// Issued at timestamp (seconds since epoch).
    pub iat: u64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: u64,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: Vec<String>,
}

impl TokenClaims {
    /// Parses the primary role claim, if it names a known role.
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    /// Builds a minimal `UserAttributes` skeleton from token claims alone.
    ///
    /// KYC, employment, and account-restriction fields keep their unknown
    /// defaults — enrichment is the attribute-collection service's job, not
    /// the token's.
    pub fn skeleton_attributes(&self) -> UserAttributes {
        let mut user = UserAttributes::new(self.sub.as_str(), self.email.as_str());
        if let Some(role) = self.parsed_role() {
            user = user.with_global_role(role);
        }
        user
    }
}

// ============================================================================
// AuthService
// ============================================================================

/// Verifies (and, for service use, issues) platform bearer tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: JwtConfig,
}

impl AuthService {
    /// Creates an authentication service over the given JWT configuration.
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    /// Verifies a bearer token and returns its claims.
    ///
    /// A missing token, a bad signature, a wrong issuer/audience, and an
    /// expired token are all authentication failures; none of them reach
    /// the ABAC evaluators.
    pub fn verify_token(&self, token: Option<&str>) -> SecurityResult<TokenClaims> {
        let token = token.ok_or(SecurityError::MissingToken)?;

        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&self.config.audience);

        let token_data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::ExpiredToken,
            _ => SecurityError::InvalidToken {
                detail: e.to_string(),
            },
        })?;

        Ok(token_data.claims)
    }

    /// Issues a signed token for the given subject.
    pub fn issue_token(
        &self,
        subject: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        permissions: Vec<String>,
    ) -> SecurityResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SecurityError::Internal {
                detail: format!("system clock before Unix epoch: {e}"),
            })?
            .as_secs();

        let claims = TokenClaims {
            sub: subject.into(),
            email: email.into(),
            role: role.as_str().to_string(),
            permissions,
            iat: now,
            exp: now + self.config.expiration.as_secs(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| SecurityError::Internal {
            detail: format!("failed to sign token: {e}"),
        })
    }
}
