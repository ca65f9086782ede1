//! # lyceum-security: Security middleware pipeline
//!
//! The request-path wiring around the ABAC decision engine: a two-stage
//! pipeline attached to each incoming request.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Incoming Request                            │
//! │  (bearer token + headers + client IP)        │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Stage 1: Authentication (fast path)         │
//! │  ├─ Verify bearer token (JWT, HS256)         │
//! │  ├─ Reject missing/invalid/expired → 401     │
//! │  └─ Coarse basic-auth check on claims → 403  │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Stage 2: ABAC evaluation                    │
//! │  ├─ Enrich attributes (AttributeSource)      │
//! │  ├─ Decision cache lookup                    │
//! │  ├─ On miss: validate_access + store         │
//! │  └─ Denial → 403 SecurityError::Forbidden    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The pipeline throws typed [`SecurityError`] values; a terminal handler
//! in the host framework maps them onto HTTP responses via
//! [`SecurityError::status_code`] and [`SecurityError::code`].

pub mod auth;
pub mod config;
pub mod error;
pub mod layer;
pub mod pipeline;

// Re-export commonly used types
pub use auth::{AuthService, JwtConfig, TokenClaims};
pub use config::{SecurityConfig, SecurityConfigLoader};
pub use error::{SecurityError, SecurityErrorKind, SecurityResult};
pub use layer::{AuthenticationConfig, BasicAuthConfig, SecurityLayer};
pub use pipeline::{AttributeSource, AuthorizedRequest, RequestContext, SecurityPipeline};
