pub mod bearer;
pub mod error;
pub mod factory;
pub mod gate;
pub mod identity;
pub mod service;
pub mod validator;

pub use error::AuthError;
pub use factory::{build_auth_service, build_key_provider};
pub use gate::{AuthorizationDecision, DenyReason, Requirement, authorize};
pub use identity::Identity;
pub use service::AuthService;
pub use validator::{TokenValidator, ValidationPolicy};
