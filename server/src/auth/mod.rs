pub mod errors;
pub mod guards;
pub mod identity;
pub mod middleware;
pub mod service;
pub mod tokens;

pub use errors::{AuthError, GuardError};
pub use guards::{Guard, require_permissions, require_role};
pub use identity::{Authentication, Identity};
pub use middleware::{AUTH_MODE_HEADER, authenticate_request, bearer_token};
pub use service::{AuthService, FallbackAdmin, LoginOutcome, RefreshOutcome};
pub use tokens::{TokenError, TokenIssuer};
